//! Job lifecycle vocabulary: handles, states, progress, and outcomes.

use serde::{Deserialize, Serialize};

/// Identifier pair issued by the upload step.
///
/// Consumed to open the progress channel; discarded once the job reaches
/// a terminal state.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct JobHandle {
    /// Opaque token issued by the weaving service.
    pub job_id: String,
    /// Server-side name of the uploaded primary media.
    pub remote_filename: String,
}

/// A non-terminal progress notification.
///
/// `percent` is expected to be 0–100 and non-decreasing, but neither is
/// enforced here: values are passed through exactly as received.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProgressEvent {
    /// Human-readable phase label.
    pub status: String,
    pub percent: u8,
}

/// Where a terminal failure originated.
///
/// Callers may treat both kinds the same; logs and telemetry keep them
/// apart.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FailureKind {
    /// The service explicitly reported the job as failed.
    Remote,
    /// The transport dropped before any terminal message arrived.
    Connection,
}

/// The terminal result of a job. Exactly one outcome ends a job.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum Outcome {
    Success {
        /// Service-relative location of the produced artifact.
        result_location: String,
    },
    Failure {
        kind: FailureKind,
        message: String,
    },
}

/// Lifecycle states of a job controller.
///
/// `Idle` is initial. `Succeeded` and `Failed` are terminal; a fresh
/// submission is required to re-enter `Validating`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum JobState {
    Idle,
    Validating,
    Uploading,
    AwaitingChannel,
    Streaming,
    Succeeded,
    Failed,
}

impl JobState {
    /// Whether a new submission may begin from this state.
    pub fn accepts_submission(&self) -> bool {
        matches!(self, Self::Idle | Self::Succeeded | Self::Failed)
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Succeeded | Self::Failed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn idle_and_terminal_states_accept_submission() {
        assert!(JobState::Idle.accepts_submission());
        assert!(JobState::Succeeded.accepts_submission());
        assert!(JobState::Failed.accepts_submission());
    }

    #[test]
    fn in_flight_states_reject_submission() {
        assert!(!JobState::Validating.accepts_submission());
        assert!(!JobState::Uploading.accepts_submission());
        assert!(!JobState::AwaitingChannel.accepts_submission());
        assert!(!JobState::Streaming.accepts_submission());
    }

    #[test]
    fn only_succeeded_and_failed_are_terminal() {
        assert!(JobState::Succeeded.is_terminal());
        assert!(JobState::Failed.is_terminal());
        assert!(!JobState::Idle.is_terminal());
        assert!(!JobState::Streaming.is_terminal());
    }
}
