//! Terminal-backed [`Prompter`].

use std::io::IsTerminal;

use a11y_autofix_core::Prompter;
use dialoguer::{Confirm, Select};
use tracing::warn;

/// Prompts on the controlling terminal. When stdin is not a terminal every
/// pick cancels and every confirmation declines.
pub struct TerminalPrompter {
    interactive: bool,
}

impl TerminalPrompter {
    pub fn detect() -> Self {
        Self {
            interactive: std::io::stdin().is_terminal(),
        }
    }
}

impl Prompter for TerminalPrompter {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn show(&self, text: &str) {
        println!("{text}");
    }

    fn select(&self, prompt: &str, items: &[String]) -> Option<usize> {
        if !self.interactive || items.is_empty() {
            return None;
        }
        match Select::new()
            .with_prompt(prompt)
            .items(items)
            .default(0)
            .interact_opt()
        {
            Ok(choice) => choice,
            Err(e) => {
                warn!(error = %e, "prompt failed");
                None
            }
        }
    }

    fn confirm(&self, prompt: &str) -> bool {
        if !self.interactive {
            println!("{prompt} [y/N] (no terminal, declining)");
            return false;
        }
        Confirm::new()
            .with_prompt(prompt)
            .default(false)
            .interact()
            .unwrap_or_else(|e| {
                warn!(error = %e, "prompt failed");
                false
            })
    }
}
