use thiserror::Error;

use crate::model::ActeeId;

/// Result type returned by a resolution run.
pub type ResolveResult<T> = Result<T, ResolveError>;

/// Boxed error produced by a [`crate::SnapshotSource`].
pub type SourceError = Box<dyn std::error::Error + Send + Sync>;

/// Conditions that abort a resolution run. None of them leave a partial result behind.
///
/// Data-quality problems that can be recovered locally are not errors; they are
/// collected into [`crate::Diagnostics`] instead.
#[derive(Debug, Error)]
pub enum ResolveError {
    /// The parent relation among live actees contains a cycle; `actee` lies on it.
    #[error("actee hierarchy contains a cycle through {actee}")]
    CycleDetected { actee: ActeeId },

    /// Two live actees share an identifier.
    #[error("duplicate actee identifier {actee}")]
    DuplicateActee { actee: ActeeId },

    /// The configured deadline passed before propagation converged.
    #[error("deadline exceeded after {steps} propagation steps")]
    DeadlineExceeded { steps: usize },

    /// The run was cancelled through its [`crate::CancelToken`].
    #[error("resolution cancelled after {steps} propagation steps")]
    Cancelled { steps: usize },

    /// The snapshot could not be loaded.
    #[error("failed to load snapshot: {0}")]
    Source(#[source] SourceError),
}

impl ResolveError {
    /// Whether the error stems from an invariant violation in the input rather than
    /// from the run being interrupted.
    pub fn is_invariant_violation(&self) -> bool {
        matches!(self, Self::CycleDetected { .. } | Self::DuplicateActee { .. })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    #[test]
    fn messages_name_the_offending_actee() {
        let actee = ActeeId::from_uuid(Uuid::from_u128(7));
        let err = ResolveError::CycleDetected { actee };
        assert_eq!(
            err.to_string(),
            "actee hierarchy contains a cycle through 00000000-0000-0000-0000-000000000007"
        );
        assert!(err.is_invariant_violation());
        assert!(!ResolveError::Cancelled { steps: 2 }.is_invariant_violation());
    }
}
