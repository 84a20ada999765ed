use std::fs;
use std::io::{self, Write};
use std::path::Path;

use clap::CommandFactory;
use clap_complete::{generate, Shell};

use crate::cli::{Cli, CompletionShell};
use crate::error::CliError;

impl From<CompletionShell> for Shell {
    fn from(shell: CompletionShell) -> Self {
        match shell {
            CompletionShell::Bash => Self::Bash,
            CompletionShell::Zsh => Self::Zsh,
            CompletionShell::Fish => Self::Fish,
            CompletionShell::PowerShell => Self::PowerShell,
            CompletionShell::Elvish => Self::Elvish,
        }
    }
}

/// Completion script for `shell`, named after the `till` binary
pub fn render_completions(shell: CompletionShell) -> Vec<u8> {
    let mut command = Cli::command();
    let bin_name = command.get_name().to_string();
    let mut script = Vec::new();
    generate(Shell::from(shell), &mut command, bin_name, &mut script);
    script
}

pub fn run_completions(shell: CompletionShell, output_path: Option<&Path>) -> Result<(), CliError> {
    let script = render_completions(shell);

    let Some(path) = output_path else {
        io::stdout().write_all(&script)?;
        return Ok(());
    };

    if let Some(parent) = path.parent().filter(|parent| !parent.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, &script)?;
    tracing::info!("Wrote {shell:?} completions to {}", path.display());
    println!("{}", path.display());
    Ok(())
}
