//! Scripted prompter for testing

#![allow(dead_code)]

use async_trait::async_trait;
use backport::error::{Error, Result};
use backport::prompt::Prompter;
use std::collections::VecDeque;
use std::sync::Mutex;

/// Answers questions from a script and records what was asked
#[derive(Default)]
pub struct ScriptedPrompter {
    confirms: Mutex<VecDeque<bool>>,
    branch_picks: Mutex<VecDeque<Vec<String>>>,
    commit_picks: Mutex<VecDeque<Vec<usize>>>,
    questions: Mutex<Vec<String>>,
    branch_choices: Mutex<Vec<(Vec<String>, bool)>>,
}

impl ScriptedPrompter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer the next confirmations in order
    pub fn with_confirms(self, answers: &[bool]) -> Self {
        self.confirms.lock().unwrap().extend(answers.iter().copied());
        self
    }

    /// Answer the next branch selection
    pub fn with_branch_pick(self, branches: &[&str]) -> Self {
        self.branch_picks
            .lock()
            .unwrap()
            .push_back(branches.iter().map(ToString::to_string).collect());
        self
    }

    /// Answer the next commit selection
    pub fn with_commit_pick(self, indices: &[usize]) -> Self {
        self.commit_picks
            .lock()
            .unwrap()
            .push_back(indices.to_vec());
        self
    }

    /// Confirmation messages shown so far
    pub fn questions(&self) -> Vec<String> {
        self.questions.lock().unwrap().clone()
    }

    /// Branch selections offered so far, with the multi-select flag
    pub fn branch_choices(&self) -> Vec<(Vec<String>, bool)> {
        self.branch_choices.lock().unwrap().clone()
    }
}

fn unscripted(what: &str) -> Error {
    Error::Internal(format!("unexpected prompt: {what}"))
}

#[async_trait]
impl Prompter for ScriptedPrompter {
    async fn confirm(&self, message: &str) -> Result<bool> {
        self.questions.lock().unwrap().push(message.to_string());
        self.confirms
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| unscripted("confirm"))
    }

    async fn select_branches(&self, choices: &[String], multiple: bool) -> Result<Vec<String>> {
        self.branch_choices
            .lock()
            .unwrap()
            .push((choices.to_vec(), multiple));
        self.branch_picks
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| unscripted("select branches"))
    }

    async fn select_commits(&self, _choices: &[String], _multiple: bool) -> Result<Vec<usize>> {
        self.commit_picks
            .lock()
            .unwrap()
            .pop_front()
            .ok_or_else(|| unscripted("select commits"))
    }
}
