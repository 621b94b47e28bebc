//! Bounded retry for tool invocations
//!
//! Handlers re-invoke a failed generation or execution tool with the same
//! input until it succeeds or the per-request budget is exhausted, keeping
//! the last error. The budget is shared across all tool calls within one
//! request: `retry_count` carries over from phase to phase and handler to
//! handler. Classification is never retried.

use std::future::Future;

use tracing::warn;

use crate::tools::ToolError;

/// Per-request retry budget
///
/// `used` mirrors the request state's `retry_count`; handlers seed it from
/// the state and write the final value back through their state update.
#[derive(Debug, Clone, Copy)]
pub struct RetryBudget {
    pub used: u32,
    pub max: u32,
}

impl RetryBudget {
    pub fn new(used: u32, max: u32) -> Self {
        Self { used, max }
    }

    pub fn remaining(&self) -> u32 {
        self.max.saturating_sub(self.used)
    }

    pub fn is_exhausted(&self) -> bool {
        self.used >= self.max
    }
}

/// Invoke `op` until it succeeds or the budget runs out
///
/// The first attempt is free; each re-invocation consumes one retry from
/// the budget. Returns the last error once no retries remain.
pub async fn with_retries<T, F, Fut>(budget: &mut RetryBudget, mut op: F) -> Result<T, ToolError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ToolError>>,
{
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(error) => {
                if budget.is_exhausted() {
                    return Err(error);
                }
                budget.used += 1;
                warn!(
                    error = %error,
                    retries_used = budget.used,
                    max_retries = budget.max,
                    "Tool call failed, retrying with the same input"
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[tokio::test]
    async fn test_success_consumes_no_retries() {
        let mut budget = RetryBudget::new(0, 2);
        let result: Result<i32, ToolError> = with_retries(&mut budget, || async { Ok(7) }).await;

        assert_eq!(result.unwrap(), 7);
        assert_eq!(budget.used, 0);
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let attempts = AtomicU32::new(0);
        let mut budget = RetryBudget::new(0, 2);

        let result = with_retries(&mut budget, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move {
                if n < 2 {
                    Err(ToolError::Execution("transient".to_string()))
                } else {
                    Ok("done")
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "done");
        assert_eq!(attempts.load(Ordering::SeqCst), 3);
        assert_eq!(budget.used, 2);
    }

    #[tokio::test]
    async fn test_gives_up_with_last_error() {
        let mut budget = RetryBudget::new(0, 1);
        let attempts = AtomicU32::new(0);

        let result: Result<(), ToolError> = with_retries(&mut budget, || {
            let n = attempts.fetch_add(1, Ordering::SeqCst);
            async move { Err(ToolError::Execution(format!("attempt {n}"))) }
        })
        .await;

        // First attempt plus one retry, and the error kept is the last one
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        match result {
            Err(ToolError::Execution(message)) => assert_eq!(message, "attempt 1"),
            other => panic!("expected execution error, got {other:?}"),
        }
        assert!(budget.is_exhausted());
    }

    #[tokio::test]
    async fn test_budget_carries_over_between_calls() {
        // A budget already spent by an earlier phase allows no retries here
        let mut budget = RetryBudget::new(1, 1);
        let attempts = AtomicU32::new(0);

        let result: Result<(), ToolError> = with_retries(&mut budget, || {
            attempts.fetch_add(1, Ordering::SeqCst);
            async { Err(ToolError::Execution("still failing".to_string())) }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(attempts.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_remaining_saturates() {
        let budget = RetryBudget::new(5, 3);
        assert_eq!(budget.remaining(), 0);
        assert!(budget.is_exhausted());
    }
}
