//! Bounded fan-out of one remote call per target.
//!
//! Every target yields exactly one outcome, delivered on either the success
//! or the failure queue. A job that panics is reported as a failure.

use std::future::Future;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

use fleet_types::RemoteFailure;
use futures::FutureExt;
use tokio::sync::{mpsc, Semaphore};
use tokio::time::Instant;
use tracing::warn;

pub const JOB_PANICKED: &str = "job panicked";

#[derive(Debug, Clone, PartialEq)]
pub struct Success<K, T> {
    pub target: K,
    pub data: T,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Failure<K> {
    pub target: K,
    pub message: String,
}

/// Receiving side of a fan-out in progress.
pub struct Dispatched<K, T> {
    pub successes: mpsc::UnboundedReceiver<Success<K, T>>,
    pub failures: mpsc::UnboundedReceiver<Failure<K>>,
    pub total_expected: usize,
    pub started_at: Instant,
}

/// Spawn `job` once per target with at most `concurrency` in flight.
///
/// Returns immediately; each task waits for its permit on its own. A
/// `concurrency` of 0 is treated as 1. Outcomes sent after the receivers are
/// dropped are discarded.
pub fn dispatch<K, T, F, Fut>(targets: Vec<K>, concurrency: usize, job: F) -> Dispatched<K, T>
where
    K: Clone + Send + 'static,
    T: Send + 'static,
    F: Fn(K) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<T, RemoteFailure>> + Send + 'static,
{
    let semaphore = Arc::new(Semaphore::new(concurrency.max(1)));
    let job = Arc::new(job);
    let (ok_tx, ok_rx) = mpsc::unbounded_channel();
    let (err_tx, err_rx) = mpsc::unbounded_channel();
    let total_expected = targets.len();
    let started_at = Instant::now();

    for target in targets {
        let semaphore = semaphore.clone();
        let job = job.clone();
        let ok_tx = ok_tx.clone();
        let err_tx = err_tx.clone();

        tokio::spawn(async move {
            let _permit = match semaphore.acquire_owned().await {
                Ok(permit) => permit,
                Err(_) => {
                    let _ = err_tx.send(Failure {
                        target,
                        message: "dispatcher closed".to_string(),
                    });
                    return;
                }
            };

            let call_target = target.clone();
            let outcome = AssertUnwindSafe(async move { job(call_target).await })
                .catch_unwind()
                .await;

            match outcome {
                Ok(Ok(data)) => {
                    let _ = ok_tx.send(Success { target, data });
                }
                Ok(Err(failure)) => {
                    let _ = err_tx.send(Failure {
                        target,
                        message: failure.message,
                    });
                }
                Err(_) => {
                    warn!("Fan-out job panicked");
                    let _ = err_tx.send(Failure {
                        target,
                        message: JOB_PANICKED.to_string(),
                    });
                }
            }
        });
    }

    Dispatched {
        successes: ok_rx,
        failures: err_rx,
        total_expected,
        started_at,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    async fn drain<K, T>(mut d: Dispatched<K, T>) -> (Vec<Success<K, T>>, Vec<Failure<K>>) {
        let mut ok = Vec::new();
        let mut err = Vec::new();
        while let Some(s) = d.successes.recv().await {
            ok.push(s);
        }
        while let Some(f) = d.failures.recv().await {
            err.push(f);
        }
        (ok, err)
    }

    #[tokio::test(start_paused = true)]
    async fn test_in_flight_never_exceeds_concurrency() {
        let in_flight = Arc::new(AtomicUsize::new(0));
        let peak = Arc::new(AtomicUsize::new(0));

        let (f, p) = (in_flight.clone(), peak.clone());
        let dispatched = dispatch((0..10).collect::<Vec<u32>>(), 3, move |n| {
            let in_flight = f.clone();
            let peak = p.clone();
            async move {
                let now = in_flight.fetch_add(1, Ordering::SeqCst) + 1;
                peak.fetch_max(now, Ordering::SeqCst);
                tokio::time::sleep(Duration::from_millis(10)).await;
                in_flight.fetch_sub(1, Ordering::SeqCst);
                Ok::<_, RemoteFailure>(n)
            }
        });
        assert_eq!(dispatched.total_expected, 10);

        let (ok, err) = drain(dispatched).await;
        assert_eq!(ok.len(), 10);
        assert!(err.is_empty());
        assert!(peak.load(Ordering::SeqCst) <= 3);
    }

    #[tokio::test]
    async fn test_zero_concurrency_still_runs_every_job() {
        let dispatched = dispatch(vec!["a", "b"], 0, |t| async move { Ok::<_, RemoteFailure>(t.len()) });
        let (ok, _) = drain(dispatched).await;
        assert_eq!(ok.len(), 2);
    }

    #[tokio::test]
    async fn test_failures_carry_the_remote_message() {
        let dispatched = dispatch(vec![1, 2, 3], 2, |t| async move {
            if t == 2 {
                Err(RemoteFailure::new("rate limited"))
            } else {
                Ok(())
            }
        });
        let (ok, err) = drain(dispatched).await;
        assert_eq!(ok.len(), 2);
        assert_eq!(
            err,
            vec![Failure {
                target: 2,
                message: "rate limited".to_string()
            }]
        );
    }

    #[tokio::test]
    async fn test_panicking_job_becomes_a_failure() {
        let dispatched = dispatch(vec![1, 2], 2, |t| async move {
            if t == 1 {
                panic!("boom");
            }
            Ok::<_, RemoteFailure>(t)
        });
        let (ok, err) = drain(dispatched).await;
        assert_eq!(ok.len(), 1);
        assert_eq!(err.len(), 1);
        assert_eq!(err[0].target, 1);
        assert_eq!(err[0].message, JOB_PANICKED);
    }

    #[tokio::test]
    async fn test_empty_target_list_closes_both_queues() {
        let dispatched = dispatch(Vec::<u8>::new(), 4, |_| async { Ok::<_, RemoteFailure>(()) });
        assert_eq!(dispatched.total_expected, 0);
        let (ok, err) = drain(dispatched).await;
        assert!(ok.is_empty() && err.is_empty());
    }
}
