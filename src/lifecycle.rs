//! Intake lifecycle as an explicit state machine.
//!
//! A file's stage is encoded by the directory it sits in. The functions here
//! decide where an inbox file should go without touching the filesystem;
//! callers perform the rename only after a transition has been accepted.
//! Past `SyncReady` the sync directory itself is the state: the listing
//! service reports moves into the archive and the sync client reports
//! per-file pull statuses.

use crate::domain::models::{ModelFormat, ScanVerdict, Validation};
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    Inbox,
    Quarantine,
    Rejected,
    SyncReady,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Event {
    Infected,
    Rejected,
    Accepted,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
#[error("illegal lifecycle transition: {event:?} from {from:?}")]
pub struct IllegalTransition {
    pub from: Stage,
    pub event: Event,
}

impl Stage {
    pub fn transition(self, event: Event) -> Result<Stage, IllegalTransition> {
        use Event as E;
        use Stage as S;
        let next = match (self, event) {
            (S::Inbox, E::Infected) => S::Quarantine,
            (S::Inbox, E::Rejected) => S::Rejected,
            (S::Inbox, E::Accepted) => S::SyncReady,
            (from, event) => return Err(IllegalTransition { from, event }),
        };
        Ok(next)
    }

    /// Quarantined files never leave the quarantine directory.
    pub fn is_terminal(self) -> bool {
        matches!(self, Stage::Quarantine)
    }
}

/// Intake decision for one inbox file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Quarantine { reason: String },
    Reject { reason: String },
    Accept { format: ModelFormat, count: u64 },
    Unsupported { reason: String },
}

impl Decision {
    /// Event to apply to an `Inbox` file, or `None` when it stays put.
    pub fn event(&self, reject_unsupported: bool) -> Option<Event> {
        match self {
            Decision::Quarantine { .. } => Some(Event::Infected),
            Decision::Reject { .. } => Some(Event::Rejected),
            Decision::Accept { .. } => Some(Event::Accepted),
            Decision::Unsupported { .. } if reject_unsupported => Some(Event::Rejected),
            Decision::Unsupported { .. } => None,
        }
    }

    pub fn target_stage(&self, reject_unsupported: bool) -> Result<Stage, IllegalTransition> {
        match self.event(reject_unsupported) {
            Some(event) => Stage::Inbox.transition(event),
            None => Ok(Stage::Inbox),
        }
    }

    pub fn action(&self) -> &'static str {
        match self {
            Decision::Quarantine { .. } => "quarantined",
            Decision::Reject { .. } => "rejected",
            Decision::Accept { .. } => "accepted",
            Decision::Unsupported { .. } => "unsupported",
        }
    }

    pub fn reason(&self) -> String {
        match self {
            Decision::Quarantine { reason }
            | Decision::Reject { reason }
            | Decision::Unsupported { reason } => reason.clone(),
            Decision::Accept { format, count } => format!("valid {format} ({count})"),
        }
    }
}

/// Scan first; the validators only run for a clean file.
pub fn decide(verdict: ScanVerdict, validate: impl FnOnce() -> Validation) -> Decision {
    match verdict {
        ScanVerdict::Infected => Decision::Quarantine {
            reason: "scanner reported an infected file".to_string(),
        },
        ScanVerdict::Inconclusive => Decision::Reject {
            reason: "scan summary missing or unreadable".to_string(),
        },
        ScanVerdict::Clean => match validate() {
            Validation::Valid { format, count } => Decision::Accept { format, count },
            Validation::Invalid { reason } => Decision::Unsupported { reason },
        },
    }
}
