use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Three-way status of a check.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum State {
    Success,
    Failure,
    Exception,
}

impl State {
    /// The nullable boolean form used by notification payloads.
    pub fn success_flag(&self) -> Option<bool> {
        match self {
            State::Success => Some(true),
            State::Failure => Some(false),
            State::Exception => None,
        }
    }
}

impl std::fmt::Display for State {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            State::Success => write!(f, "SUCCESS"),
            State::Failure => write!(f, "FAILURE"),
            State::Exception => write!(f, "EXCEPTION"),
        }
    }
}

/// Exception and failure strings gathered while checking items.
///
/// Strings are deduplicated on insert, so two expansions that address the
/// same physical key report once.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Findings {
    pub exceptions: Vec<String>,
    pub failures: Vec<String>,
}

impl Findings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn exception(message: impl Into<String>) -> Self {
        let mut findings = Self::new();
        findings.push_exception(message);
        findings
    }

    pub fn push_exception(&mut self, message: impl Into<String>) {
        push_unique(&mut self.exceptions, message.into());
    }

    pub fn push_failure(&mut self, message: impl Into<String>) {
        push_unique(&mut self.failures, message.into());
    }

    pub fn merge(&mut self, other: Findings) {
        for message in other.exceptions {
            push_unique(&mut self.exceptions, message);
        }
        for message in other.failures {
            push_unique(&mut self.failures, message);
        }
    }

    pub fn is_clean(&self) -> bool {
        self.exceptions.is_empty() && self.failures.is_empty()
    }
}

fn push_unique(list: &mut Vec<String>, message: String) {
    if !list.contains(&message) {
        list.push(message);
    }
}

/// Per-target result of one run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckOutcome {
    /// `None` when any exception was raised, otherwise whether no failure was found.
    pub success: Option<bool>,
    pub exception_strings: Vec<String>,
    pub failure_strings: Vec<String>,
}

impl CheckOutcome {
    /// Classify findings: any exception dominates, then any failure.
    pub fn from_findings(findings: Findings) -> Self {
        let success = if !findings.exceptions.is_empty() {
            None
        } else {
            Some(findings.failures.is_empty())
        };

        Self {
            success,
            exception_strings: findings.exceptions,
            failure_strings: findings.failures,
        }
    }

    pub fn state(&self) -> State {
        match self.success {
            Some(true) => State::Success,
            Some(false) => State::Failure,
            None => State::Exception,
        }
    }

    pub fn has_failure(&self) -> bool {
        !self.failure_strings.is_empty()
    }

    pub fn has_exception(&self) -> bool {
        !self.exception_strings.is_empty()
    }
}

/// Outcomes of every target in a run, keyed and ordered by target name.
pub type RunOutcome = BTreeMap<String, CheckOutcome>;

/// Structured record handed to the notification and persistence collaborators.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResultRecord {
    pub target: String,
    pub subject: String,
    pub details: String,
    pub short_message: String,
    pub state: State,
    pub success: Option<bool>,
    pub snapshot: serde_json::Value,
}
