//! Operator interaction seam.
//!
//! The engine never touches the terminal directly. Site disambiguation,
//! interactive picks, the payload preview and the send confirmation all go
//! through a [`Prompter`], so tests drive them with a [`ScriptedPrompter`].

use std::collections::VecDeque;
use std::sync::Mutex;

/// Operator-facing prompts.
pub trait Prompter: Send + Sync {
    /// Whether an operator can answer prompts at all.
    fn is_interactive(&self) -> bool;

    /// Show informational text (listings, payload previews).
    fn show(&self, text: &str);

    /// Ask the operator to pick one of `items`. `None` means cancelled.
    fn select(&self, prompt: &str, items: &[String]) -> Option<usize>;

    /// Ask a yes/no question. Anything but an explicit yes is a no.
    fn confirm(&self, prompt: &str) -> bool;
}

/// Prompter that replays pre-recorded answers and records what it was shown.
///
/// Once the script runs out, selections cancel and confirmations decline.
#[derive(Debug, Default)]
pub struct ScriptedPrompter {
    interactive: bool,
    selections: Mutex<VecDeque<Option<usize>>>,
    confirmations: Mutex<VecDeque<bool>>,
    shown: Mutex<Vec<String>>,
    prompts: Mutex<Vec<String>>,
}

impl ScriptedPrompter {
    /// An interactive prompter with an empty script.
    pub fn new() -> Self {
        Self {
            interactive: true,
            ..Default::default()
        }
    }

    /// A prompter standing in for a non-terminal stdin.
    pub fn non_interactive() -> Self {
        Self::default()
    }

    pub fn with_selection(self, index: usize) -> Self {
        lock(&self.selections).push_back(Some(index));
        self
    }

    pub fn with_cancelled_selection(self) -> Self {
        lock(&self.selections).push_back(None);
        self
    }

    pub fn with_confirmation(self, answer: bool) -> Self {
        lock(&self.confirmations).push_back(answer);
        self
    }

    /// Everything passed to [`Prompter::show`], in order.
    pub fn shown(&self) -> Vec<String> {
        lock(&self.shown).clone()
    }

    /// Every select and confirm prompt asked, in order.
    pub fn prompts(&self) -> Vec<String> {
        lock(&self.prompts).clone()
    }
}

impl Prompter for ScriptedPrompter {
    fn is_interactive(&self) -> bool {
        self.interactive
    }

    fn show(&self, text: &str) {
        lock(&self.shown).push(text.to_string());
    }

    fn select(&self, prompt: &str, items: &[String]) -> Option<usize> {
        lock(&self.prompts).push(prompt.to_string());
        if !self.interactive {
            return None;
        }
        lock(&self.selections)
            .pop_front()
            .flatten()
            .filter(|index| *index < items.len())
    }

    fn confirm(&self, prompt: &str) -> bool {
        lock(&self.prompts).push(prompt.to_string());
        self.interactive && lock(&self.confirmations).pop_front().unwrap_or(false)
    }
}

fn lock<T>(mutex: &Mutex<T>) -> std::sync::MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Shorten `text` to at most `max` characters, marking the cut with `...`.
pub fn truncate(text: &str, max: usize) -> String {
    let text = text.trim();
    if text.chars().count() <= max {
        return text.to_string();
    }
    let kept: String = text.chars().take(max.saturating_sub(3)).collect();
    format!("{kept}...")
}
