//! Interactive questions
//!
//! The engine only asks; how the question is put to a human is up to the
//! implementor (the binary uses dialoguer).

use crate::error::Result;
use async_trait::async_trait;

/// Asks the user to confirm or choose
#[async_trait]
pub trait Prompter: Send + Sync {
    /// Yes/no question; `false` means the user declined
    async fn confirm(&self, message: &str) -> Result<bool>;

    /// Pick target branches from `choices`; single-select unless `multiple`
    async fn select_branches(&self, choices: &[String], multiple: bool) -> Result<Vec<String>>;

    /// Pick commits by index into `choices`; single-select unless `multiple`
    async fn select_commits(&self, choices: &[String], multiple: bool) -> Result<Vec<usize>>;
}
