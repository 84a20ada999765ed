//! Sale model

use serde::{Deserialize, Serialize};

use super::{Entity, EntityKind};
use crate::util::contains_ignore_case;

/// One line of a sale
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SaleItem {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub price: f64,
    #[serde(default)]
    pub quantity: i64,
}

/// A completed sale (receipt)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Sale {
    pub id: String,
    #[serde(default)]
    pub items: Vec<SaleItem>,
    #[serde(default)]
    pub total: f64,
    #[serde(default)]
    pub payment_method: String,
    /// ISO-8601 date string as printed on the receipt
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub receipt_no: String,
    /// Name of the signed-in user who rang up the sale
    #[serde(default)]
    pub user_name: String,
    #[serde(default)]
    pub last_modified: i64,
    #[serde(default)]
    pub version: u64,
}

impl Sale {
    /// Create a sale from line items, computing the total
    #[must_use]
    pub fn new(items: Vec<SaleItem>, payment_method: impl Into<String>) -> Self {
        let now = chrono::Utc::now();
        let id = super::new_record_id();
        let receipt_no = format!("R{}", now.timestamp_millis());
        Self {
            total: Self::total_of(&items),
            id,
            items,
            payment_method: payment_method.into(),
            date: now.to_rfc3339(),
            receipt_no,
            user_name: String::new(),
            last_modified: 0,
            version: 0,
        }
    }

    /// Sum of `price * quantity` over all lines
    #[allow(clippy::cast_precision_loss)] // quantities are small counts
    pub fn total_of(items: &[SaleItem]) -> f64 {
        items
            .iter()
            .map(|item| item.price * item.quantity as f64)
            .sum()
    }
}

/// Remote sale search filter
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleSearch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub receipt_no: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<String>,
}

impl Entity for Sale {
    const KIND: EntityKind = EntityKind::Sale;
    type Search = SaleSearch;

    fn id(&self) -> &str {
        &self.id
    }

    fn last_modified(&self) -> i64 {
        self.last_modified
    }

    fn version(&self) -> u64 {
        self.version
    }

    fn set_stamp(&mut self, last_modified: i64, version: u64) {
        self.last_modified = last_modified;
        self.version = version;
    }

    fn matches(&self, filter: &SaleSearch) -> bool {
        contains_ignore_case(&self.receipt_no, filter.receipt_no.as_deref())
            && contains_ignore_case(&self.user_name, filter.user_name.as_deref())
            && contains_ignore_case(&self.date, filter.date.as_deref())
    }

    /// Newest first
    fn sort_search_results(records: &mut [Self]) {
        records.sort_by(|left, right| right.date.cmp(&left.date));
    }
}
