use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::future::join_all;
use tracing::{debug, error, info, warn};

use crate::app::{ExtractError, Result};
use crate::config::EscalationConfig;
use crate::domain::{FetchOutcome, FetchRequest, StrategyId};
use crate::extract::{clean_html, parse_meta};
use crate::fetcher::{parallel, sequential, EscalationPolicy, FetchBackend, RawPage};

/// Headroom past a backend's own budget before the escalator gives up on it.
const BACKSTOP_GRACE: Duration = Duration::from_millis(250);

/// Runs the strategies of a request under an escalation policy.
///
/// Owns nothing but the table of backends; each backend owns its resources.
pub struct FetchEscalator {
    backends: HashMap<StrategyId, Arc<dyn FetchBackend>>,
    policy: EscalationPolicy,
    default_strategies: Vec<StrategyId>,
}

impl FetchEscalator {
    pub fn new(config: &EscalationConfig) -> Self {
        Self {
            backends: HashMap::new(),
            policy: config.policy,
            default_strategies: config.default_strategies.clone(),
        }
    }

    /// Register a backend under its own strategy id, replacing any previous one.
    pub fn with_backend(mut self, backend: Arc<dyn FetchBackend>) -> Self {
        self.backends.insert(backend.id(), backend);
        self
    }

    pub fn policy(&self) -> EscalationPolicy {
        self.policy
    }

    pub fn registered(&self) -> Vec<StrategyId> {
        let mut ids: Vec<_> = self.backends.keys().copied().collect();
        ids.sort();
        ids
    }

    /// Resolve the strategies to run, in the order the policy runs them.
    ///
    /// Fails when a strategy has no backend; that is a configuration error,
    /// not a per-URL failure.
    pub fn plan(&self, request: &FetchRequest, policy: EscalationPolicy) -> Result<Vec<StrategyId>> {
        let strategies = request.effective_strategies(&self.default_strategies);

        if let Some(missing) = strategies.iter().find(|id| !self.backends.contains_key(*id)) {
            return Err(ExtractError::UnknownStrategy(*missing));
        }

        Ok(match policy {
            EscalationPolicy::Sequential => sequential::chain(&strategies, request.xhr),
            EscalationPolicy::Race => strategies,
        })
    }

    /// Extract one URL with the configured policy.
    pub async fn extract(&self, request: &FetchRequest) -> Result<FetchOutcome> {
        self.extract_with(request, self.policy).await
    }

    pub async fn extract_with(
        &self,
        request: &FetchRequest,
        policy: EscalationPolicy,
    ) -> Result<FetchOutcome> {
        let plan = self.plan(request, policy)?;
        Ok(self.run(&plan, request, policy).await)
    }

    /// Extract several URLs concurrently; outcomes keep the input order.
    ///
    /// Every request is planned before any fetch starts, so a configuration
    /// error rejects the whole batch.
    pub async fn extract_all(
        &self,
        requests: &[FetchRequest],
        policy: EscalationPolicy,
    ) -> Result<Vec<FetchOutcome>> {
        let plans = requests
            .iter()
            .map(|request| self.plan(request, policy))
            .collect::<Result<Vec<_>>>()?;

        let runs = plans
            .iter()
            .zip(requests)
            .map(|(plan, request)| self.run(plan, request, policy));

        Ok(join_all(runs).await)
    }

    async fn run(
        &self,
        plan: &[StrategyId],
        request: &FetchRequest,
        policy: EscalationPolicy,
    ) -> FetchOutcome {
        debug!(url = %request.url, %policy, ?plan, "Extracting");
        match policy {
            EscalationPolicy::Sequential => sequential::escalate(self, plan, request).await,
            EscalationPolicy::Race => parallel::race(self, plan, request).await,
        }
    }

    /// One strategy, one URL. Never fails: timeouts and backend errors
    /// become failed outcomes.
    pub async fn attempt(&self, strategy: StrategyId, request: &FetchRequest) -> FetchOutcome {
        let Some(backend) = self.backends.get(&strategy) else {
            return FetchOutcome::failed(
                &request.url,
                strategy,
                ExtractError::UnknownStrategy(strategy).to_string(),
            );
        };

        let started = Instant::now();
        let budget = backend.timeout();
        let raw = match tokio::time::timeout(budget + BACKSTOP_GRACE, backend.fetch(request, budget))
            .await
        {
            Ok(Ok(raw)) => raw,
            Ok(Err(e)) => RawPage::Failed(e.to_string()),
            Err(_) => {
                warn!(url = %request.url, %strategy, "Backend overran its budget");
                RawPage::timeout()
            }
        };

        if let RawPage::Failed(reason) = &raw {
            if *reason == RawPage::timeout_reason() {
                warn!(url = %request.url, %strategy, "Fetch timed out");
            } else {
                error!(url = %request.url, %strategy, reason = %reason, "Fetch failed");
            }
        }

        let outcome = into_outcome(request, strategy, raw);
        info!(
            url = %request.url,
            %strategy,
            success = outcome.succeeded,
            "Fetched in {:.2}s",
            started.elapsed().as_secs_f64()
        );
        outcome
    }

    /// Close every backend. Errors are logged; every backend gets closed.
    pub async fn close(&self) {
        for id in self.registered() {
            if let Some(backend) = self.backends.get(&id) {
                if let Err(e) = backend.close().await {
                    error!(strategy = %id, error = %e, "Failed to close backend");
                }
            }
        }
    }
}

fn into_outcome(request: &FetchRequest, strategy: StrategyId, raw: RawPage) -> FetchOutcome {
    match raw {
        RawPage::Html(html) => {
            let html = clean_html(&html, request.clean);
            let meta = parse_meta(&html);
            FetchOutcome {
                url: request.url.clone(),
                title: meta.title,
                keywords: meta.keywords,
                description: meta.description,
                html,
                succeeded: true,
                failure_reason: String::new(),
                strategy,
            }
        }
        RawPage::Failed(reason) => FetchOutcome::failed(&request.url, strategy, reason),
    }
}
