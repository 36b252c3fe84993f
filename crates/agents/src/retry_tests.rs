// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use crate::error::AgentError;
use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn fast_policy() -> RetryPolicy {
    RetryPolicy { max_attempts: 3, base_delay: Duration::from_millis(1) }
}

#[tokio::test]
async fn success_on_first_attempt() {
    let calls = Arc::new(AtomicU32::new(0));
    let c = Arc::clone(&calls);
    let result = with_retry(fast_policy(), move || {
        let c = Arc::clone(&c);
        async move {
            c.fetch_add(1, Ordering::SeqCst);
            Ok::<_, AgentError>(42)
        }
    })
    .await
    .unwrap();
    assert_eq!(result, 42);
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[tokio::test]
async fn transient_errors_retry_until_success() {
    let calls = Arc::new(AtomicU32::new(0));
    let c = Arc::clone(&calls);
    let result = with_retry(fast_policy(), move || {
        let c = Arc::clone(&c);
        async move {
            if c.fetch_add(1, Ordering::SeqCst) < 2 {
                Err(AgentError::Timeout("slow".into()))
            } else {
                Ok("done")
            }
        }
    })
    .await
    .unwrap();
    assert_eq!(result, "done");
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn exhaustion_propagates_last_error() {
    let calls = Arc::new(AtomicU32::new(0));
    let c = Arc::clone(&calls);
    let err = with_retry(fast_policy(), move || {
        let c = Arc::clone(&c);
        async move {
            c.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(AgentError::Connection("refused".into()))
        }
    })
    .await
    .unwrap_err();
    assert!(matches!(err, AgentError::Connection(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
}

#[tokio::test]
async fn permanent_errors_do_not_retry() {
    let calls = Arc::new(AtomicU32::new(0));
    let c = Arc::clone(&calls);
    let err = with_retry(fast_policy(), move || {
        let c = Arc::clone(&c);
        async move {
            c.fetch_add(1, Ordering::SeqCst);
            Err::<(), _>(AgentError::InvalidDispatch("no issue id".into()))
        }
    })
    .await
    .unwrap_err();
    assert!(matches!(err, AgentError::InvalidDispatch(_)));
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn backoff_doubles_per_attempt() {
    let policy = RetryPolicy { max_attempts: 4, base_delay: Duration::from_secs(2) };
    assert_eq!(policy.delay_for(0), Duration::from_secs(2));
    assert_eq!(policy.delay_for(1), Duration::from_secs(4));
    assert_eq!(policy.delay_for(2), Duration::from_secs(8));
}
