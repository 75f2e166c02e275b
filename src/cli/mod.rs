//! CLI front end: terminal progress and dialoguer prompts

pub mod context;
pub mod run;
pub mod style;

use crate::cli::style::{Stylize, check, clone_bar_style, cross, spinner_style};
use anstream::{eprintln, println};
use async_trait::async_trait;
use backport::backport::{ProgressCallback, TaskOutcome, TaskPhase};
use backport::error::{Error, Result};
use backport::prompt::Prompter;
use dialoguer::{Confirm, MultiSelect, Select};
use indicatif::ProgressBar;
use std::sync::Mutex;
use std::time::Duration;

/// Progress display: one spinner per running task
pub struct CliProgress {
    spinner: Mutex<Option<ProgressBar>>,
    clone_bar: Mutex<Option<ProgressBar>>,
}

impl CliProgress {
    /// Spinner-based progress
    pub const fn compact() -> Self {
        Self {
            spinner: Mutex::new(None),
            clone_bar: Mutex::new(None),
        }
    }

    fn clear_spinner(&self) {
        if let Ok(mut slot) = self.spinner.lock() {
            if let Some(spinner) = slot.take() {
                spinner.finish_and_clear();
            }
        }
    }

    fn set_spinner_message(&self, message: String) {
        let Ok(mut slot) = self.spinner.lock() else {
            return;
        };
        let spinner = slot.get_or_insert_with(|| {
            let spinner = ProgressBar::new_spinner();
            spinner.set_style(spinner_style());
            spinner.enable_steady_tick(Duration::from_millis(80));
            spinner
        });
        spinner.set_message(message);
    }
}

#[async_trait]
impl ProgressCallback for CliProgress {
    async fn on_phase(&self, target_branch: &str, phase: &TaskPhase) {
        match phase {
            // The prompt needs the terminal
            TaskPhase::ConflictResolution(_) | TaskPhase::Done | TaskPhase::Failed => {
                self.clear_spinner();
            }
            _ => self.set_spinner_message(format!("{}: {phase}", target_branch.accent())),
        }
    }

    async fn on_message(&self, message: &str) {
        let guard = self.spinner.lock().ok();
        match guard.as_ref().and_then(|slot| slot.as_ref()) {
            Some(spinner) => spinner.println(message.muted()),
            None => println!("{}", message.muted()),
        }
    }

    async fn on_task_complete(&self, outcome: &TaskOutcome) {
        self.clear_spinner();
        let branch = outcome.target_branch.name.accent();
        match outcome.error() {
            None => println!("{} {branch}", check()),
            Some(e) => eprintln!("{} {branch}: {}", cross(), e.failure()),
        }
    }

    async fn on_clone_progress(&self, percent: u8) {
        let Ok(mut slot) = self.clone_bar.lock() else {
            return;
        };
        let bar = slot.get_or_insert_with(|| {
            let bar = ProgressBar::new(100);
            bar.set_style(clone_bar_style());
            bar.set_message("Cloning repository");
            bar
        });
        bar.set_position(u64::from(percent));
        if percent >= 100 {
            bar.finish_and_clear();
            *slot = None;
        }
    }
}

/// Prompts through dialoguer on the controlling terminal
pub struct DialoguerPrompter;

async fn blocking<T, F>(f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce() -> dialoguer::Result<T> + Send + 'static,
{
    tokio::task::spawn_blocking(f)
        .await
        .map_err(|e| Error::Internal(format!("prompt task failed: {e}")))?
        .map_err(|e| Error::Internal(format!("failed to read answer: {e}")))
}

#[async_trait]
impl Prompter for DialoguerPrompter {
    async fn confirm(&self, message: &str) -> Result<bool> {
        let message = message.to_string();
        blocking(move || Confirm::new().with_prompt(message).default(true).interact()).await
    }

    async fn select_branches(&self, choices: &[String], multiple: bool) -> Result<Vec<String>> {
        let items = choices.to_vec();
        let picked = if multiple {
            let prompt_items = items.clone();
            blocking(move || {
                MultiSelect::new()
                    .with_prompt("Select branch(es) to backport to (space to select)")
                    .items(&prompt_items)
                    .interact()
            })
            .await?
        } else {
            let prompt_items = items.clone();
            vec![
                blocking(move || {
                    Select::new()
                        .with_prompt("Select a branch to backport to")
                        .items(&prompt_items)
                        .default(0)
                        .interact()
                })
                .await?,
            ]
        };
        Ok(picked
            .into_iter()
            .filter_map(|i| items.get(i).cloned())
            .collect())
    }

    async fn select_commits(&self, choices: &[String], multiple: bool) -> Result<Vec<usize>> {
        let items = choices.to_vec();
        if multiple {
            blocking(move || {
                MultiSelect::new()
                    .with_prompt("Select commit(s) to backport (space to select)")
                    .items(&items)
                    .interact()
            })
            .await
        } else {
            let index = blocking(move || {
                Select::new()
                    .with_prompt("Select a commit to backport")
                    .items(&items)
                    .default(0)
                    .interact()
            })
            .await?;
            Ok(vec![index])
        }
    }
}
