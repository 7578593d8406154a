use futures::stream::{FuturesUnordered, StreamExt};

use crate::domain::{FetchOutcome, FetchRequest, StrategyId};
use crate::fetcher::FetchEscalator;

/// Run every strategy concurrently and keep the highest scoring outcome.
///
/// Ties go to the strategy listed first, so the winner does not depend on
/// completion order.
pub async fn race(
    escalator: &FetchEscalator,
    strategies: &[StrategyId],
    request: &FetchRequest,
) -> FetchOutcome {
    let mut pending: FuturesUnordered<_> = strategies
        .iter()
        .enumerate()
        .map(|(position, strategy)| async move {
            (position, escalator.attempt(*strategy, request).await)
        })
        .collect();

    let mut best: Option<(usize, FetchOutcome)> = None;
    while let Some(candidate) = pending.next().await {
        best = Some(match best.take() {
            None => candidate,
            Some(current) => keep_better(current, candidate),
        });
    }

    best.map(|(_, outcome)| outcome).unwrap_or_else(|| {
        FetchOutcome::failed(&request.url, StrategyId::Request, "no strategy attempted")
    })
}

/// Higher score wins; on a tie the lower position wins.
fn keep_better(
    current: (usize, FetchOutcome),
    candidate: (usize, FetchOutcome),
) -> (usize, FetchOutcome) {
    let (current_score, candidate_score) = (current.1.score(), candidate.1.score());
    if candidate_score > current_score || (candidate_score == current_score && candidate.0 < current.0)
    {
        candidate
    } else {
        current
    }
}
