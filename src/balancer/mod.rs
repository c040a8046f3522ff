//! Load balancing subsystem.
//!
//! # Data Flow
//! ```text
//! start()
//!     → initial refresh (failure logged, not fatal)
//!     → spawn refresh.rs loop     (server list → registry swap)
//!     → spawn health prober loop  (ping → endpoint status)
//!
//! choose(request)
//!     → registry snapshot (lock-free)
//!     → server list filter
//!     → drop Down endpoints
//!     → selection rule
//!     → Arc<Endpoint> or NoAvailableEndpoint
//!
//! report_outcome(endpoint, outcome, latency)
//!     → stats / circuit breaker / hard-failure fast path
//! ```
//!
//! # Design Decisions
//! - `choose()` never awaits and never takes a lock
//! - Background failures are absorbed; the balancer keeps serving stale data
//! - `stop()` joins both tasks before returning and reports any that panicked
//! - Configs are validated at build time; a zero interval never reaches a task

pub mod direct;
pub mod factory;
pub mod lifecycle;
pub mod refresh;
pub mod stats;

use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::task::JoinHandle;

use crate::config::validation::validate_service;
use crate::config::ServiceConfig;
use crate::discovery::ServerList;
use crate::error::{LbError, Result};
use crate::filter::{FilterChain, ServerListFilter};
use crate::health::{self, state::log_transition, HealthProber, Outcome, Ping};
use crate::lifecycle::Shutdown;
use crate::observability::metrics;
use crate::registry::{Endpoint, RefreshOutcome, ServerRegistry};
use crate::rule::{build_rule, RequestContext, SelectionContext, SelectionRule};

pub use direct::DirectBalancer;
pub use factory::{BalancerFactory, ServiceBalancer, StrategyRegistry};
pub use lifecycle::BalancerState;
pub use refresh::Refresher;
pub use stats::{BalancerStats, EndpointReport};

/// Background tasks of one run.
#[derive(Debug)]
struct RunningTasks {
    shutdown: Shutdown,
    handles: Vec<JoinHandle<()>>,
}

/// Managed client-side load balancer for one service.
#[derive(Debug)]
pub struct LoadBalancer {
    service: String,
    refresh_interval: Duration,
    registry: Arc<ServerRegistry>,
    filter: Arc<dyn ServerListFilter>,
    rule: Arc<dyn SelectionRule>,
    refresher: Arc<Refresher>,
    prober: Arc<HealthProber>,
    state: lifecycle::StateCell,
    tasks: Mutex<Option<RunningTasks>>,
}

impl LoadBalancer {
    pub fn builder(service: impl Into<String>, config: ServiceConfig) -> LoadBalancerBuilder {
        LoadBalancerBuilder {
            service: service.into(),
            config,
            rule: None,
            ping: None,
            filter: None,
        }
    }

    pub fn service(&self) -> &str {
        &self.service
    }

    pub fn state(&self) -> BalancerState {
        self.state.get()
    }

    pub fn registry(&self) -> &Arc<ServerRegistry> {
        &self.registry
    }

    pub fn rule_name(&self) -> &'static str {
        self.rule.name()
    }

    /// Start background refresh and probing.
    ///
    /// Dropping the returned future before it completes leaves the
    /// balancer `Stopped`.
    pub async fn start(&self) -> Result<()> {
        self.state
            .transition(BalancerState::Stopped, BalancerState::Starting)
            .map_err(|state| LbError::AlreadyStarted {
                service: self.service.clone(),
                state,
            })?;
        let starting = StartingGuard::new(&self.state);

        match self.refresher.refresh_once().await {
            Ok(RefreshOutcome::Replaced { added, .. }) => {
                tracing::debug!(service = %self.service, endpoints = added, "Initial server list loaded");
            }
            Ok(RefreshOutcome::RejectedEmpty) => {}
            Err(e) => {
                tracing::warn!(service = %self.service, error = %e, "Initial refresh failed, starting with an empty server list");
            }
        }

        let shutdown = Shutdown::new();
        let handles = vec![
            tokio::spawn(
                self.refresher
                    .clone()
                    .run(self.refresh_interval, shutdown.subscribe()),
            ),
            tokio::spawn(self.prober.clone().run(shutdown.subscribe())),
        ];

        *self.lock_tasks() = Some(RunningTasks { shutdown, handles });
        starting.complete();

        tracing::info!(
            service = %self.service,
            rule = self.rule.name(),
            endpoints = self.registry.current().len(),
            "Load balancer running"
        );
        Ok(())
    }

    /// Stop background work and wait for it to finish.
    ///
    /// The balancer always ends up `Stopped`; an error reports a task that
    /// had already died (panicked) while running.
    pub async fn stop(&self) -> Result<()> {
        self.state
            .transition(BalancerState::Running, BalancerState::Stopping)
            .map_err(|state| LbError::NotRunning {
                service: self.service.clone(),
                state,
            })?;

        let mut failures = Vec::new();
        let tasks = self.lock_tasks().take();
        if let Some(RunningTasks { shutdown, handles }) = tasks {
            shutdown.trigger();
            for handle in handles {
                if let Err(e) = handle.await {
                    tracing::error!(service = %self.service, error = %e, "Background task ended abnormally");
                    metrics::record_task_failure(&self.service);
                    failures.push(e.to_string());
                }
            }
        }

        self.state.set(BalancerState::Stopped);
        tracing::info!(service = %self.service, "Load balancer stopped");

        if failures.is_empty() {
            Ok(())
        } else {
            Err(LbError::BackgroundTask {
                service: self.service.clone(),
                reason: failures.join("; "),
            })
        }
    }

    /// Pick an endpoint for one request.
    pub fn choose(&self, request: &RequestContext) -> Result<Arc<Endpoint>> {
        let state = self.state.get();
        if state != BalancerState::Running {
            return Err(LbError::NotRunning {
                service: self.service.clone(),
                state,
            });
        }

        let snapshot = self.registry.current();
        let mut candidates = self.filter.apply(snapshot.endpoints());
        candidates.retain(|e| e.is_available());

        if candidates.is_empty() {
            metrics::record_no_endpoint(&self.service);
            tracing::debug!(
                service = %self.service,
                registered = snapshot.len(),
                "No eligible endpoint"
            );
            return Err(LbError::NoAvailableEndpoint {
                service: self.service.clone(),
            });
        }

        let ctx = SelectionContext {
            service: &self.service,
            candidates: &candidates,
            request,
        };
        let chosen = self.rule.choose(&ctx)?;

        tracing::trace!(service = %self.service, endpoint = %chosen.id(), "Endpoint chosen");
        metrics::record_choice(&self.service, &chosen.id().to_string());
        Ok(chosen)
    }

    /// Feed a request outcome back into the endpoint's stats and health.
    pub fn report_outcome(&self, endpoint: &Endpoint, outcome: Outcome, latency: Duration) {
        metrics::record_latency(&self.service, latency);
        if let Some(transition) = health::record_outcome(endpoint, outcome, latency) {
            log_transition(&self.service, endpoint.id(), transition, "request");
            metrics::record_endpoint_health(&self.service, &endpoint.id().to_string(), false);
        }
    }

    /// Trigger a refresh outside the periodic schedule.
    pub async fn refresh(&self) -> Result<RefreshOutcome> {
        self.refresher.refresh_once().await
    }

    pub fn stats(&self) -> BalancerStats {
        BalancerStats::collect(&self.service, "managed", self.state(), &self.registry.current())
    }

    fn lock_tasks(&self) -> std::sync::MutexGuard<'_, Option<RunningTasks>> {
        self.tasks
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for LoadBalancer {
    fn drop(&mut self) {
        // Dropped while running: signal the tasks so nothing is orphaned.
        if let Some(tasks) = self.lock_tasks().take() {
            tasks.shutdown.trigger();
        }
    }
}

/// Resets a `Starting` balancer to `Stopped` unless completed.
struct StartingGuard<'a> {
    state: &'a lifecycle::StateCell,
    done: bool,
}

impl<'a> StartingGuard<'a> {
    fn new(state: &'a lifecycle::StateCell) -> Self {
        Self { state, done: false }
    }

    fn complete(mut self) {
        self.state.set(BalancerState::Running);
        self.done = true;
    }
}

impl Drop for StartingGuard<'_> {
    fn drop(&mut self) {
        if !self.done {
            self.state.set(BalancerState::Stopped);
        }
    }
}

/// Reject a service config that would break the background tasks.
pub(crate) fn check_config(service: &str, config: &ServiceConfig) -> Result<()> {
    validate_service(service, config).map_err(|errors| {
        LbError::Config(
            errors
                .iter()
                .map(ToString::to_string)
                .collect::<Vec<_>>()
                .join("; "),
        )
    })
}

/// Assembles a [`LoadBalancer`]; unset slots are built from the config.
pub struct LoadBalancerBuilder {
    service: String,
    config: ServiceConfig,
    rule: Option<Arc<dyn SelectionRule>>,
    ping: Option<Arc<dyn Ping>>,
    filter: Option<Arc<dyn ServerListFilter>>,
}

impl LoadBalancerBuilder {
    pub fn rule(mut self, rule: Arc<dyn SelectionRule>) -> Self {
        self.rule = Some(rule);
        self
    }

    pub fn ping(mut self, ping: Arc<dyn Ping>) -> Self {
        self.ping = Some(ping);
        self
    }

    pub fn filter(mut self, filter: Arc<dyn ServerListFilter>) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn build(self, server_list: Arc<dyn ServerList>) -> Result<LoadBalancer> {
        let config = self.config;
        check_config(&self.service, &config)?;
        let rule = self.rule.unwrap_or_else(|| build_rule(&config));
        let filter = self
            .filter
            .unwrap_or_else(|| Arc::new(FilterChain::from_config(&config.filter)));
        let ping = match self.ping {
            Some(ping) => ping,
            None => health::build_ping(&config.health_check)?,
        };

        let registry = Arc::new(ServerRegistry::new(self.service.clone(), &config));
        let refresher = Arc::new(Refresher::new(
            self.service.clone(),
            registry.clone(),
            server_list,
            config.refresh_timeout(),
        ));
        let prober = Arc::new(HealthProber::new(
            self.service.clone(),
            registry.clone(),
            ping,
            &config.health_check,
        ));

        Ok(LoadBalancer {
            service: self.service,
            refresh_interval: config.refresh_interval(),
            registry,
            filter,
            rule,
            refresher,
            prober,
            state: lifecycle::StateCell::new(),
            tasks: Mutex::new(None),
        })
    }
}
