//! ConsultationStatus enum for tracking the lifecycle of consultations.

use serde::{Deserialize, Serialize};
use std::fmt;

use super::StateMachine;

/// Lifecycle status of a video consultation.
///
/// Valid transitions:
/// - Scheduled -> InProgress (start)
/// - Scheduled -> Cancelled (cancel)
/// - InProgress -> Completed (end)
/// - InProgress -> Cancelled (cancel)
///
/// `Completed` and `Cancelled` are absorbing: once reached, no further
/// transition is valid. Callers that retry `start`/`end`/`cancel` rely
/// on the operations being no-ops from the state they already produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ConsultationStatus {
    #[default]
    Scheduled,
    InProgress,
    Completed,
    Cancelled,
}

impl ConsultationStatus {
    /// Returns true if the consultation has reached an absorbing state.
    pub fn is_terminal_state(&self) -> bool {
        matches!(
            self,
            ConsultationStatus::Completed | ConsultationStatus::Cancelled
        )
    }

    /// Stable string form used in persistence and logs.
    pub fn as_str(&self) -> &'static str {
        match self {
            ConsultationStatus::Scheduled => "scheduled",
            ConsultationStatus::InProgress => "in_progress",
            ConsultationStatus::Completed => "completed",
            ConsultationStatus::Cancelled => "cancelled",
        }
    }

    /// Parses the persisted string form.
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "scheduled" => Some(ConsultationStatus::Scheduled),
            "in_progress" => Some(ConsultationStatus::InProgress),
            "completed" => Some(ConsultationStatus::Completed),
            "cancelled" => Some(ConsultationStatus::Cancelled),
            _ => None,
        }
    }
}

impl StateMachine for ConsultationStatus {
    fn can_transition_to(&self, target: &ConsultationStatus) -> bool {
        use ConsultationStatus::*;
        matches!(
            (self, target),
            (Scheduled, InProgress)
                | (Scheduled, Cancelled)
                | (InProgress, Completed)
                | (InProgress, Cancelled)
        )
    }

    fn valid_transitions(&self) -> Vec<ConsultationStatus> {
        use ConsultationStatus::*;
        match self {
            Scheduled => vec![InProgress, Cancelled],
            InProgress => vec![Completed, Cancelled],
            Completed => vec![],
            Cancelled => vec![],
        }
    }
}

impl fmt::Display for ConsultationStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
