//! Retry across endpoints.
//!
//! # Responsibilities
//! - Choose an endpoint, run the caller's operation against it
//! - Report every attempt's outcome and latency back to the balancer
//! - Back off and choose again on failure, up to `max_attempts`
//!
//! # Design Decisions
//! - `NotRunning` is a programming error and aborts immediately
//! - `NoAvailableEndpoint` is retried like any other failure
//! - The operation decides what a failure is via [`AttemptError`]

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use thiserror::Error;

use crate::balancer::LoadBalancer;
use crate::config::RetryConfig;
use crate::error::LbError;
use crate::health::Outcome;
use crate::registry::Endpoint;
use crate::resilience::backoff::calculate_backoff;
use crate::rule::RequestContext;

/// Failure of a single attempt, as classified by the operation.
#[derive(Debug)]
pub enum AttemptError<E> {
    /// The endpoint answered but the request failed.
    Failed(E),
    /// The endpoint could not be reached.
    Unreachable(E),
}

impl<E> AttemptError<E> {
    fn outcome(&self) -> Outcome {
        match self {
            AttemptError::Failed(_) => Outcome::Failure,
            AttemptError::Unreachable(_) => Outcome::HardFailure,
        }
    }

    fn into_inner(self) -> E {
        match self {
            AttemptError::Failed(e) | AttemptError::Unreachable(e) => e,
        }
    }
}

#[derive(Debug, Error)]
pub enum RetryError<E: std::fmt::Debug + std::fmt::Display> {
    /// The balancer refused to select (not running).
    #[error(transparent)]
    Balancer(LbError),

    /// Every attempt failed; carries the last operation error.
    #[error("all {attempts} attempts failed, last error: {last}")]
    Exhausted { attempts: u32, last: E },

    /// Every attempt found no endpoint.
    #[error("no endpoint available after {attempts} attempts")]
    NoEndpoint { attempts: u32 },
}

/// Run `op` against chosen endpoints until it succeeds or the policy is exhausted.
pub async fn execute_with_retry<T, E, F, Fut>(
    lb: &LoadBalancer,
    request: &RequestContext,
    policy: &RetryConfig,
    mut op: F,
) -> Result<T, RetryError<E>>
where
    E: std::fmt::Debug + std::fmt::Display,
    F: FnMut(Arc<Endpoint>) -> Fut,
    Fut: Future<Output = Result<T, AttemptError<E>>>,
{
    let max_attempts = policy.max_attempts.max(1);
    let mut last_error: Option<E> = None;

    for attempt in 1..=max_attempts {
        if attempt > 1 {
            tokio::time::sleep(calculate_backoff(attempt - 1, policy)).await;
        }

        let endpoint = match lb.choose(request) {
            Ok(endpoint) => endpoint,
            Err(e @ LbError::NoAvailableEndpoint { .. }) => {
                tracing::debug!(service = lb.service(), attempt, error = %e, "Retrying selection");
                continue;
            }
            Err(e) => return Err(RetryError::Balancer(e)),
        };

        let guard = endpoint.begin_request();
        let started = Instant::now();
        let result = op(endpoint.clone()).await;
        let latency = started.elapsed();
        drop(guard);

        match result {
            Ok(value) => {
                lb.report_outcome(&endpoint, Outcome::Success, latency);
                return Ok(value);
            }
            Err(err) => {
                lb.report_outcome(&endpoint, err.outcome(), latency);
                let err = err.into_inner();
                tracing::debug!(
                    service = lb.service(),
                    endpoint = %endpoint.id(),
                    attempt,
                    error = %err,
                    "Attempt failed"
                );
                last_error = Some(err);
            }
        }
    }

    Err(match last_error {
        Some(last) => RetryError::Exhausted {
            attempts: max_attempts,
            last,
        },
        None => RetryError::NoEndpoint {
            attempts: max_attempts,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ServiceConfig;
    use crate::discovery::{ServiceInstance, StaticServerList};
    use crate::health::NoopPing;
    use std::sync::Mutex;

    fn policy() -> RetryConfig {
        RetryConfig {
            max_attempts: 3,
            base_delay_ms: 1,
            max_delay_ms: 5,
        }
    }

    async fn running(hosts: &[&str]) -> LoadBalancer {
        let mut config = ServiceConfig::default();
        config.health_check.enabled = false;
        let list = StaticServerList::new(hosts.iter().map(|h| ServiceInstance::new(*h, 80)).collect());
        let lb = LoadBalancer::builder("users", config)
            .ping(Arc::new(NoopPing))
            .build(Arc::new(list))
            .unwrap();
        lb.start().await.unwrap();
        lb
    }

    #[tokio::test]
    async fn test_moves_to_next_endpoint() {
        let lb = running(&["a", "b"]).await;
        let tried = Mutex::new(Vec::new());

        let result = execute_with_retry(&lb, &RequestContext::default(), &policy(), |ep| {
            let host = ep.id().host.clone();
            tried.lock().unwrap().push(host.clone());
            async move {
                if host == "a" {
                    Err(AttemptError::Failed("boom".to_string()))
                } else {
                    Ok(host)
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(result, "b");
        assert_eq!(*tried.lock().unwrap(), vec!["a", "b"]);

        let a = &lb.stats().endpoints[0];
        assert_eq!(a.failures, 1);
        assert_eq!(a.active_requests, 0);
        lb.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_unreachable_marks_down_and_exhausts() {
        let lb = running(&["a"]).await;

        let err = execute_with_retry(&lb, &RequestContext::default(), &policy(), |_ep| async {
            Err::<(), _>(AttemptError::Unreachable("refused".to_string()))
        })
        .await
        .unwrap_err();

        // First attempt forces "a" down; later attempts find nothing to choose.
        assert!(matches!(err, RetryError::Exhausted { attempts: 3, .. }));
        assert_eq!(lb.stats().available(), 0);
        lb.stop().await.unwrap();
    }

    #[tokio::test]
    async fn test_not_running_aborts() {
        let lb = running(&["a"]).await;
        lb.stop().await.unwrap();

        let err = execute_with_retry(&lb, &RequestContext::default(), &policy(), |_ep| async {
            Ok::<_, AttemptError<String>>(())
        })
        .await
        .unwrap_err();
        assert!(matches!(err, RetryError::Balancer(LbError::NotRunning { .. })));
    }
}
