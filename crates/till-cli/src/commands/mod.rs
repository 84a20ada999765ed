pub mod common;
pub mod completions;
pub mod delete;
pub mod list;
pub mod owner;
pub mod pending;
pub mod put;
pub mod search;
pub mod sync;

/// Run `$body` with `$T` bound to the record type of an `EntityKind`
macro_rules! with_entity {
    ($kind:expr, |$T:ident| $body:expr) => {
        match $kind {
            till_core::EntityKind::Product => {
                type $T = till_core::Product;
                $body
            }
            till_core::EntityKind::Branch => {
                type $T = till_core::Branch;
                $body
            }
            till_core::EntityKind::Cashier => {
                type $T = till_core::Cashier;
                $body
            }
            till_core::EntityKind::Supplier => {
                type $T = till_core::Supplier;
                $body
            }
            till_core::EntityKind::Sale => {
                type $T = till_core::Sale;
                $body
            }
            till_core::EntityKind::Customer => {
                type $T = till_core::Customer;
                $body
            }
        }
    };
}

pub(crate) use with_entity;
