//! Collects fan-out outcomes under a deadline.

use std::collections::HashMap;
use std::time::Duration;

use tokio::time::Instant;
use tracing::{debug, warn};

use crate::dispatch::{Dispatched, Failure, Success};

/// When aggregation stops waiting for stragglers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Deadline {
    /// Armed when aggregation starts.
    Fixed(Duration),
    /// `after_first` starts counting at the first outcome; `fallback` counts
    /// from dispatch start. Whichever elapses first wins.
    Lazy { after_first: Duration, fallback: Duration },
}

#[derive(Debug, Clone, PartialEq)]
pub struct FailureGroup<K> {
    pub message: String,
    pub targets: Vec<K>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct AggregationResult<K, T> {
    /// In arrival order
    pub successes: Vec<Success<K, T>>,
    /// One group per distinct error text, ordered by first arrival
    pub failures: Vec<FailureGroup<K>>,
    /// Outcomes not observed before the deadline
    pub missing: usize,
}

impl<K, T> AggregationResult<K, T> {
    pub fn failure_count(&self) -> usize {
        self.failures.iter().map(|g| g.targets.len()).sum()
    }

    pub fn is_clean(&self) -> bool {
        self.failures.is_empty() && self.missing == 0
    }
}

fn push_failure<K>(
    groups: &mut Vec<FailureGroup<K>>,
    index: &mut HashMap<String, usize>,
    failure: Failure<K>,
) {
    match index.get(&failure.message) {
        Some(&i) => groups[i].targets.push(failure.target),
        None => {
            index.insert(failure.message.clone(), groups.len());
            groups.push(FailureGroup {
                message: failure.message,
                targets: vec![failure.target],
            });
        }
    }
}

/// Drain both queues until every expected outcome arrived, both queues
/// closed, or the deadline elapsed. Late outcomes are dropped with the
/// receivers.
pub async fn aggregate<K, T>(dispatched: Dispatched<K, T>, deadline: Deadline) -> AggregationResult<K, T> {
    let Dispatched {
        mut successes,
        mut failures,
        total_expected,
        started_at,
    } = dispatched;

    let (initial, after_first) = match deadline {
        Deadline::Fixed(d) => (Instant::now() + d, None),
        Deadline::Lazy {
            after_first,
            fallback,
        } => (started_at + fallback, Some(after_first)),
    };
    let sleep = tokio::time::sleep_until(initial);
    tokio::pin!(sleep);

    let mut ok = Vec::new();
    let mut groups: Vec<FailureGroup<K>> = Vec::new();
    let mut index = HashMap::new();
    let mut received = 0usize;
    let mut ok_open = true;
    let mut err_open = true;
    let mut timed_out = false;
    let mut first_seen = false;

    while received < total_expected && (ok_open || err_open) {
        tokio::select! {
            item = successes.recv(), if ok_open => match item {
                Some(success) => {
                    received += 1;
                    ok.push(success);
                }
                None => ok_open = false,
            },
            item = failures.recv(), if err_open => match item {
                Some(failure) => {
                    received += 1;
                    push_failure(&mut groups, &mut index, failure);
                }
                None => err_open = false,
            },
            _ = &mut sleep => {
                timed_out = true;
                break;
            }
        }

        if !first_seen && received > 0 {
            first_seen = true;
            if let Some(d) = after_first {
                let lazy = Instant::now() + d;
                if lazy < sleep.deadline() {
                    sleep.as_mut().reset(lazy);
                }
            }
        }
    }

    let missing = total_expected.saturating_sub(received);
    if timed_out {
        warn!(received, missing, "Deadline elapsed before every outcome arrived");
    } else {
        debug!(received, failures = groups.len(), "Fan-out complete");
    }

    AggregationResult {
        successes: ok,
        failures: groups,
        missing,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatch::dispatch;
    use fleet_types::RemoteFailure;

    fn ms(n: u64) -> Duration {
        Duration::from_millis(n)
    }

    #[tokio::test(start_paused = true)]
    async fn test_two_successes_and_one_grouped_failure() {
        let dispatched = dispatch(vec!["alpha", "beta", "target3"], 3, |t| async move {
            match t {
                "alpha" => {
                    tokio::time::sleep(ms(10)).await;
                    Ok(t)
                }
                "beta" => {
                    tokio::time::sleep(ms(20)).await;
                    Ok(t)
                }
                _ => {
                    tokio::time::sleep(ms(30)).await;
                    Err(RemoteFailure::new("rate limited"))
                }
            }
        });
        let result = aggregate(dispatched, Deadline::Fixed(Duration::from_secs(5))).await;

        let names: Vec<&str> = result.successes.iter().map(|s| s.data).collect();
        assert_eq!(names, vec!["alpha", "beta"]);
        assert_eq!(
            result.failures,
            vec![FailureGroup {
                message: "rate limited".to_string(),
                targets: vec!["target3"],
            }]
        );
        assert_eq!(result.missing, 0);
    }

    #[tokio::test]
    async fn test_every_target_is_accounted_for() {
        let dispatched = dispatch((0..20).collect::<Vec<u32>>(), 4, |n| async move {
            if n % 3 == 0 {
                Err(RemoteFailure::new(format!("err {}", n % 2)))
            } else {
                Ok(n)
            }
        });
        let result = aggregate(dispatched, Deadline::Fixed(Duration::from_secs(60))).await;
        assert_eq!(result.successes.len() + result.failure_count(), 20);
        assert_eq!(result.missing, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_identical_messages_share_one_group() {
        let dispatched = dispatch(vec![1, 2, 3, 4, 5, 6], 6, |n| async move {
            tokio::time::sleep(ms(n * 10)).await;
            if n <= 4 {
                Err::<(), _>(RemoteFailure::new("timeout"))
            } else {
                Err(RemoteFailure::new("rate limited"))
            }
        });
        let result = aggregate(dispatched, Deadline::Fixed(Duration::from_secs(5))).await;

        assert_eq!(result.failures.len(), 2);
        assert_eq!(result.failures[0].message, "timeout");
        let mut first = result.failures[0].targets.clone();
        first.sort();
        assert_eq!(first, vec![1, 2, 3, 4]);
        assert_eq!(result.failures[1].message, "rate limited");
        assert_eq!(result.failures[1].targets.len(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fixed_deadline_reports_missing() {
        let start = Instant::now();
        let dispatched = dispatch(vec![1, 2], 2, |n| async move {
            if n == 2 {
                tokio::time::sleep(Duration::from_secs(3600)).await;
            }
            Ok::<_, RemoteFailure>(n)
        });
        let result = aggregate(dispatched, Deadline::Fixed(Duration::from_secs(5))).await;

        assert_eq!(result.successes.len(), 1);
        assert_eq!(result.missing, 1);
        assert!(!result.is_clean());
        let waited = Instant::now() - start;
        assert!(waited >= Duration::from_secs(5) && waited < Duration::from_secs(6));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lazy_deadline_starts_at_first_outcome() {
        let start = Instant::now();
        let dispatched = dispatch(vec![1, 2], 2, |n| async move {
            let wait = if n == 1 { 1 } else { 60 };
            tokio::time::sleep(Duration::from_secs(wait)).await;
            Ok::<_, RemoteFailure>(n)
        });
        let deadline = Deadline::Lazy {
            after_first: Duration::from_secs(2),
            fallback: Duration::from_secs(120),
        };
        let result = aggregate(dispatched, deadline).await;

        assert_eq!(result.successes.len(), 1);
        assert_eq!(result.missing, 1);
        let waited = Instant::now() - start;
        assert!(waited >= Duration::from_secs(3) && waited < Duration::from_secs(4));
    }

    #[tokio::test(start_paused = true)]
    async fn test_lazy_fallback_fires_when_nothing_arrives() {
        let start = Instant::now();
        let dispatched = dispatch(vec![1, 2, 3], 3, |n| async move {
            tokio::time::sleep(Duration::from_secs(3600)).await;
            Ok::<_, RemoteFailure>(n)
        });
        let deadline = Deadline::Lazy {
            after_first: Duration::from_secs(2),
            fallback: Duration::from_secs(10),
        };
        let result = aggregate(dispatched, deadline).await;

        assert!(result.successes.is_empty());
        assert_eq!(result.missing, 3);
        let waited = Instant::now() - start;
        assert!(waited >= Duration::from_secs(10) && waited < Duration::from_secs(11));
    }

    #[tokio::test(start_paused = true)]
    async fn test_returns_as_soon_as_all_outcomes_arrive() {
        let start = Instant::now();
        let dispatched = dispatch(vec![1, 2], 2, |n| async move {
            tokio::time::sleep(Duration::from_secs(1)).await;
            Ok::<_, RemoteFailure>(n)
        });
        let result = aggregate(dispatched, Deadline::Fixed(Duration::from_secs(120))).await;

        assert_eq!(result.successes.len(), 2);
        assert!(result.is_clean());
        assert!(Instant::now() - start < Duration::from_secs(2));
    }
}
