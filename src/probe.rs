// src/probe.rs
//
// Ordered fallback over endpoint candidates: try each in turn, stop at the
// first success, remember why the others failed.

use crate::error::TransportError;
use crate::models::EndpointCandidate;
use futures::future::BoxFuture;
use log::warn;
use std::fmt;

/// Why a single candidate did not work out.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ProbeFailure {
    pub label: &'static str,
    pub reason: String,
}

impl ProbeFailure {
    pub fn new(candidate: &EndpointCandidate, error: &TransportError) -> Self {
        Self {
            label: candidate.label,
            reason: error.reason(),
        }
    }
}

impl fmt::Display for ProbeFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.label, self.reason)
    }
}

/// Runs `attempt` on each candidate in order until one succeeds.
///
/// Each candidate is tried exactly once and strictly sequentially. All
/// failure kinds are treated alike. On success, returns the winning candidate
/// and its value; otherwise every collected failure, in candidate order.
pub async fn first_success<'c, 'f, T, F>(
    candidates: &'c [EndpointCandidate],
    mut attempt: F,
) -> Result<(&'c EndpointCandidate, T), Vec<ProbeFailure>>
where
    F: FnMut(&'c EndpointCandidate) -> BoxFuture<'f, Result<T, TransportError>>,
{
    let mut failures = Vec::with_capacity(candidates.len());

    for candidate in candidates {
        match attempt(candidate).await {
            Ok(value) => return Ok((candidate, value)),
            Err(e) => {
                let failure = ProbeFailure::new(candidate, &e);
                warn!("Probe: {} failed: {}", candidate.label, failure.reason);
                failures.push(failure);
            }
        }
    }

    Err(failures)
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::FutureExt;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const CANDIDATES: [EndpointCandidate; 3] = [
        EndpointCandidate::new("/a", "a"),
        EndpointCandidate::new("/b", "b"),
        EndpointCandidate::new("/c", "c"),
    ];

    #[tokio::test]
    async fn test_stops_at_first_success() {
        let calls = AtomicUsize::new(0);
        let result = first_success(&CANDIDATES, |c| {
            calls.fetch_add(1, Ordering::SeqCst);
            let ok = c.label == "b";
            async move {
                if ok {
                    Ok(c.path)
                } else {
                    Err(TransportError::Network("down".to_string()))
                }
            }
            .boxed()
        })
        .await;

        let (winner, value) = result.unwrap();
        assert_eq!(winner.label, "b");
        assert_eq!(value, "/b");
        assert_eq!(calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_collects_all_failures_in_order() {
        let result: Result<(&EndpointCandidate, ()), _> = first_success(&CANDIDATES, |c| {
            let error = if c.label == "c" {
                TransportError::Network(String::new())
            } else {
                TransportError::Status { status: 404, message: None }
            };
            async move { Err(error) }.boxed()
        })
        .await;

        let failures = result.unwrap_err();
        let labels: Vec<_> = failures.iter().map(|f| f.label).collect();
        assert_eq!(labels, vec!["a", "b", "c"]);
        assert_eq!(failures[0].to_string(), "a: Request failed with status code 404");
        assert_eq!(failures[2].to_string(), "c: Unknown error");
    }

    #[tokio::test]
    async fn test_empty_candidate_list() {
        let result: Result<(&EndpointCandidate, ()), _> =
            first_success(&[], |_| async { Ok(()) }.boxed()).await;
        assert!(result.unwrap_err().is_empty());
    }
}
