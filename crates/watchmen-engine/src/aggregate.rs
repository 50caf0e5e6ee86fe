use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::json;
use watchmen_types::{CheckOutcome, ResultRecord, RunOutcome, State, Trigger};

/// Separator line between failure text and exception text in details.
pub const EXCEPTION_SEPARATOR: &str = "--- exceptions ---";

/// Run-wide facts stamped into every record's snapshot.
#[derive(Debug, Clone)]
pub struct RunContext {
    pub run_id: String,
    pub reference_time: DateTime<Utc>,
    pub trigger: Option<Trigger>,
    /// Target name under which the rolled-up record is published.
    pub generic_target: String,
}

/// Rolled-up state of a whole run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum CompositeState {
    Success,
    Failure,
    Exception,
    FailureAndException,
}

impl CompositeState {
    pub fn from_outcomes(outcomes: &RunOutcome) -> Self {
        let has_failure = outcomes.values().any(CheckOutcome::has_failure);
        let has_exception = outcomes.values().any(CheckOutcome::has_exception);
        match (has_failure, has_exception) {
            (false, false) => CompositeState::Success,
            (true, false) => CompositeState::Failure,
            (false, true) => CompositeState::Exception,
            (true, true) => CompositeState::FailureAndException,
        }
    }

    pub fn state(&self) -> State {
        match self {
            CompositeState::Success => State::Success,
            CompositeState::Failure => State::Failure,
            CompositeState::Exception | CompositeState::FailureAndException => State::Exception,
        }
    }

    pub fn subject(&self) -> &'static str {
        match self {
            CompositeState::Success => "[watchmen] All targets passed",
            CompositeState::Failure => "[watchmen] Data check failures detected",
            CompositeState::Exception => "[watchmen] Data check exceptions raised",
            CompositeState::FailureAndException => "[watchmen] Data check failures and exceptions",
        }
    }

    pub fn short_message(&self) -> &'static str {
        match self {
            CompositeState::Success => "All targets passed",
            CompositeState::Failure => "One or more targets failed",
            CompositeState::Exception => "One or more targets raised exceptions",
            CompositeState::FailureAndException => "Targets failed and raised exceptions",
        }
    }
}

/// Run-level problems that prevent any target from being resolved.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunFault {
    InvalidEvent,
    ConfigLoad,
}

impl RunFault {
    pub fn subject(&self) -> &'static str {
        match self {
            RunFault::InvalidEvent => "[watchmen] Invalid event",
            RunFault::ConfigLoad => "[watchmen] Configuration load failed",
        }
    }

    pub fn short_message(&self) -> &'static str {
        match self {
            RunFault::InvalidEvent => "Event could not be interpreted; no targets were checked",
            RunFault::ConfigLoad => "Configuration could not be loaded; no targets were checked",
        }
    }
}

/// Failure text first, then exception text after a separator line.
pub fn target_details(outcome: &CheckOutcome) -> String {
    let failures = outcome.failure_strings.join("\n");
    if outcome.exception_strings.is_empty() {
        return failures;
    }

    let exceptions = outcome.exception_strings.join("\n");
    if failures.is_empty() {
        format!("{}\n{}", EXCEPTION_SEPARATOR, exceptions)
    } else {
        format!("{}\n{}\n{}", failures, EXCEPTION_SEPARATOR, exceptions)
    }
}

pub fn target_record(name: &str, outcome: &CheckOutcome, ctx: &RunContext) -> ResultRecord {
    let state = outcome.state();
    let (subject, short_message) = match state {
        State::Success => (
            format!("[watchmen] {}: all checks passed", name),
            "All checks passed",
        ),
        State::Failure => (
            format!("[watchmen] {}: data check failed", name),
            "Data check failed",
        ),
        State::Exception => (
            format!("[watchmen] {}: data check raised an exception", name),
            "Data check raised an exception",
        ),
    };

    ResultRecord {
        target: name.to_string(),
        subject,
        details: target_details(outcome),
        short_message: short_message.to_string(),
        state,
        success: state.success_flag(),
        snapshot: json!({
            "run_id": ctx.run_id,
            "reference_time": ctx.reference_time.to_rfc3339(),
            "trigger": ctx.trigger,
            "outcome": outcome,
        }),
    }
}

/// Build one record per target plus the rolled-up generic record.
pub fn aggregate(outcomes: &RunOutcome, ctx: &RunContext) -> (Vec<ResultRecord>, ResultRecord) {
    let records: Vec<ResultRecord> = outcomes
        .iter()
        .map(|(name, outcome)| target_record(name, outcome, ctx))
        .collect();

    let composite = CompositeState::from_outcomes(outcomes);
    let details = records
        .iter()
        .filter(|record| !record.details.is_empty())
        .map(|record| format!("{}:\n{}", record.target, record.details))
        .collect::<Vec<_>>()
        .join("\n\n");

    let count = |state: State| outcomes.values().filter(|o| o.state() == state).count();
    let state = composite.state();

    let generic = ResultRecord {
        target: ctx.generic_target.clone(),
        subject: composite.subject().to_string(),
        details,
        short_message: composite.short_message().to_string(),
        state,
        success: state.success_flag(),
        snapshot: json!({
            "run_id": ctx.run_id,
            "reference_time": ctx.reference_time.to_rfc3339(),
            "trigger": ctx.trigger,
            "composite_state": composite,
            "targets": {
                "total": outcomes.len(),
                "success": count(State::Success),
                "failure": count(State::Failure),
                "exception": count(State::Exception),
            },
        }),
    };

    (records, generic)
}

/// The single record emitted when a run cannot resolve any target.
pub fn fault_record(fault: RunFault, message: &str, ctx: &RunContext) -> ResultRecord {
    ResultRecord {
        target: ctx.generic_target.clone(),
        subject: fault.subject().to_string(),
        details: message.to_string(),
        short_message: fault.short_message().to_string(),
        state: State::Exception,
        success: None,
        snapshot: json!({
            "run_id": ctx.run_id,
            "reference_time": ctx.reference_time.to_rfc3339(),
            "trigger": ctx.trigger,
            "error": message,
        }),
    }
}
