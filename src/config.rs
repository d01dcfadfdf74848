use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::error::{ResolveError, ResolveResult};

/// Minimum number of independent trees before propagation fans out across threads.
pub const DEFAULT_PARALLEL_THRESHOLD: usize = 64;

/// Cooperative cancellation flag shared between a caller and a running resolution.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    cancelled: Arc<AtomicBool>,
}

impl CancelToken {
    pub fn new() -> Self {
        Self::default()
    }

    /// Requests cancellation. Takes effect at the next propagation step boundary.
    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Release);
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Acquire)
    }
}

/// Tuning and interruption settings for a [`crate::Resolver`].
#[derive(Debug, Clone)]
pub struct ResolverConfig {
    deadline: Option<Duration>,
    cancel_token: Option<CancelToken>,
    parallel_threshold: usize,
}

impl Default for ResolverConfig {
    fn default() -> Self {
        Self {
            deadline: None,
            cancel_token: None,
            parallel_threshold: DEFAULT_PARALLEL_THRESHOLD,
        }
    }
}

impl ResolverConfig {
    /// Creates a configuration with no deadline and no cancellation token.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the overall time budget of a run.
    pub fn with_deadline(mut self, deadline: Duration) -> Self {
        self.deadline = Some(deadline);
        self
    }

    /// Attaches a token that can stop a run between propagation steps.
    pub fn with_cancel_token(mut self, token: CancelToken) -> Self {
        self.cancel_token = Some(token);
        self
    }

    /// Sets how many root trees are needed before propagation runs in parallel.
    pub fn with_parallel_threshold(mut self, threshold: usize) -> Self {
        self.parallel_threshold = threshold;
        self
    }

    pub fn deadline(&self) -> Option<Duration> {
        self.deadline
    }

    pub fn cancel_token(&self) -> Option<&CancelToken> {
        self.cancel_token.as_ref()
    }

    pub fn parallel_threshold(&self) -> usize {
        self.parallel_threshold
    }

    pub(crate) fn interrupt(&self, started: Instant) -> Interrupt {
        Interrupt {
            expires_at: self.deadline.map(|budget| started + budget),
            cancel_token: self.cancel_token.clone(),
        }
    }
}

/// Deadline and cancellation checks for one run.
#[derive(Debug, Clone)]
pub(crate) struct Interrupt {
    expires_at: Option<Instant>,
    cancel_token: Option<CancelToken>,
}

impl Interrupt {
    /// Fails if the run was cancelled or has run out of time.
    pub(crate) fn check(&self, steps: usize) -> ResolveResult<()> {
        if self.cancel_token.as_ref().is_some_and(CancelToken::is_cancelled) {
            return Err(ResolveError::Cancelled { steps });
        }
        if self.expires_at.is_some_and(|at| Instant::now() >= at) {
            return Err(ResolveError::DeadlineExceeded { steps });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builder_sets_fields() {
        let token = CancelToken::new();
        let config = ResolverConfig::new()
            .with_deadline(Duration::from_secs(5))
            .with_cancel_token(token.clone())
            .with_parallel_threshold(2);

        assert_eq!(config.deadline(), Some(Duration::from_secs(5)));
        assert!(config.cancel_token().is_some());
        assert_eq!(config.parallel_threshold(), 2);
    }

    #[test]
    fn cancelled_token_interrupts() {
        let token = CancelToken::new();
        let config = ResolverConfig::new().with_cancel_token(token.clone());
        let interrupt = config.interrupt(Instant::now());
        assert!(interrupt.check(0).is_ok());

        token.cancel();
        assert!(matches!(interrupt.check(3), Err(ResolveError::Cancelled { steps: 3 })));
    }

    #[test]
    fn zero_deadline_expires_immediately() {
        let config = ResolverConfig::new().with_deadline(Duration::ZERO);
        let interrupt = config.interrupt(Instant::now());
        assert!(matches!(
            interrupt.check(1),
            Err(ResolveError::DeadlineExceeded { steps: 1 })
        ));
    }
}
