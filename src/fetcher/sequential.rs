use tracing::info;

use crate::domain::{FetchOutcome, FetchRequest, StrategyId};
use crate::extract::is_usable;
use crate::fetcher::FetchEscalator;

/// Order strategies cheapest first.
///
/// When the page depends on XHR and an XHR-capable strategy was requested,
/// the cheaper strategies are skipped.
pub fn chain(strategies: &[StrategyId], xhr: bool) -> Vec<StrategyId> {
    let mut chain = strategies.to_vec();
    chain.sort();
    chain.dedup();

    if xhr {
        if let Some(capable) = chain.iter().copied().find(StrategyId::honors_xhr) {
            return vec![capable];
        }
    }

    chain
}

/// Try each strategy in turn until one succeeds with usable content.
///
/// When every strategy is exhausted the last outcome is returned as is,
/// with its own success flag.
pub async fn escalate(
    escalator: &FetchEscalator,
    chain: &[StrategyId],
    request: &FetchRequest,
) -> FetchOutcome {
    let mut last = None;

    for (position, strategy) in chain.iter().enumerate() {
        let outcome = escalator.attempt(*strategy, request).await;

        if outcome.succeeded && is_usable(&outcome.title, &outcome.html) {
            return outcome;
        }

        if position + 1 < chain.len() {
            info!(
                url = %request.url,
                strategy = %strategy,
                success = outcome.succeeded,
                reason = %outcome.failure_reason,
                "Result not usable, escalating"
            );
        }
        last = Some(outcome);
    }

    last.unwrap_or_else(|| {
        FetchOutcome::failed(&request.url, StrategyId::Request, "no strategy attempted")
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chain_sorted_by_cost() {
        let chain = chain(
            &[StrategyId::Stealth, StrategyId::Request, StrategyId::Browser],
            false,
        );
        assert_eq!(chain, StrategyId::ALL.to_vec());
    }

    #[test]
    fn test_chain_xhr_jumps_to_capable_strategy() {
        let chain = chain(&StrategyId::ALL, true);
        assert_eq!(chain, vec![StrategyId::Stealth]);
    }

    #[test]
    fn test_chain_xhr_without_capable_strategy_keeps_order() {
        let chain = chain(&[StrategyId::Browser, StrategyId::Request], true);
        assert_eq!(chain, vec![StrategyId::Request, StrategyId::Browser]);
    }
}
