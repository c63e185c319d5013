// Health Prober - periodic reachability checks of external dependencies
//
// Each cycle probes every dependency concurrently, each bounded by a probe
// timeout, and alerts through the chat sink according to the alert policy.

use crate::application::notifications::ChatAlerter;
use crate::application::worker::ShutdownToken;
use crate::domain::{DependencyStatus, HealthState};
use crate::error::{AppError, Result};
use crate::port::{BrokerClient, JobStore};
use async_trait::async_trait;
use futures::future::join_all;
use serde::Deserialize;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{debug, info, warn};

/// Default interval between probe cycles (15 minutes)
pub const DEFAULT_PROBE_INTERVAL: Duration = Duration::from_secs(15 * 60);

/// Default bound on a single probe (3 seconds)
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

/// One reachability check
#[async_trait]
pub trait Probe: Send + Sync {
    /// Dependency name as shown in alerts
    fn name(&self) -> &str;

    async fn check(&self) -> Result<()>;
}

/// Probes the job store backing service
pub struct JobStoreProbe {
    store: Arc<dyn JobStore>,
}

impl JobStoreProbe {
    pub fn new(store: Arc<dyn JobStore>) -> Self {
        Self { store }
    }
}

#[async_trait]
impl Probe for JobStoreProbe {
    fn name(&self) -> &str {
        "job_store"
    }

    async fn check(&self) -> Result<()> {
        Ok(self.store.ping().await?)
    }
}

/// Probes the message broker
pub struct BrokerProbe {
    broker: Arc<dyn BrokerClient>,
}

impl BrokerProbe {
    pub fn new(broker: Arc<dyn BrokerClient>) -> Self {
        Self { broker }
    }
}

#[async_trait]
impl Probe for BrokerProbe {
    fn name(&self) -> &str {
        "broker"
    }

    async fn check(&self) -> Result<()> {
        Ok(self.broker.ping().await?)
    }
}

/// When to post the health summary
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AlertPolicy {
    /// Post after every cycle
    #[default]
    EveryCycle,
    /// Post after the first cycle and whenever availability changes
    OnTransition,
}

/// Periodic dependency prober
pub struct HealthProber {
    probes: Vec<Arc<dyn Probe>>,
    alerter: ChatAlerter,
    interval: Duration,
    probe_timeout: Duration,
    policy: AlertPolicy,
    last: Mutex<Option<HealthState>>,
}

impl HealthProber {
    pub fn new(probes: Vec<Arc<dyn Probe>>, alerter: ChatAlerter) -> Self {
        Self {
            probes,
            alerter,
            interval: DEFAULT_PROBE_INTERVAL,
            probe_timeout: DEFAULT_PROBE_TIMEOUT,
            policy: AlertPolicy::default(),
            last: Mutex::new(None),
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_probe_timeout(mut self, timeout: Duration) -> Self {
        self.probe_timeout = timeout;
        self
    }

    pub fn with_policy(mut self, policy: AlertPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Run probe cycles until shutdown
    pub async fn run(self, mut shutdown: ShutdownToken) {
        info!(
            interval_secs = self.interval.as_secs(),
            probes = self.probes.len(),
            policy = ?self.policy,
            "Health prober started"
        );

        let mut tick = interval(self.interval);
        // after a stall, one cycle rather than a burst of catch-up alerts
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            if shutdown.is_shutdown() {
                break;
            }
            tokio::select! {
                _ = tick.tick() => {
                    self.run_once().await;
                }
                _ = shutdown.wait() => break,
            }
        }

        info!("Health prober stopped");
    }

    /// Probe every dependency once and alert per policy
    pub async fn run_once(&self) -> HealthState {
        let results = join_all(self.probes.iter().map(|probe| self.probe(probe.as_ref()))).await;

        let mut state = HealthState::new();
        for (name, status) in results {
            state.record(name, status);
        }

        let previous = self
            .last
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .replace(state.clone());

        if self.should_alert(previous.as_ref(), &state) {
            self.alerter.alert(&state.summary()).await;
        } else {
            debug!("Availability unchanged; alert suppressed");
        }

        state
    }

    async fn probe(&self, probe: &dyn Probe) -> (String, DependencyStatus) {
        let name = probe.name().to_string();
        let outcome = match tokio::time::timeout(self.probe_timeout, probe.check()).await {
            Ok(result) => result,
            Err(_) => Err(AppError::Internal(format!(
                "probe timed out after {}ms",
                self.probe_timeout.as_millis()
            ))),
        };

        let status = match outcome {
            Ok(()) => DependencyStatus::Up,
            Err(err) => {
                warn!(dependency = %name, class = err.class(), error = %err, "Dependency down");
                DependencyStatus::Down(err.to_string())
            }
        };
        (name, status)
    }

    fn should_alert(&self, previous: Option<&HealthState>, current: &HealthState) -> bool {
        match self.policy {
            AlertPolicy::EveryCycle => true,
            AlertPolicy::OnTransition => previous.map_or(true, |p| !p.same_availability(current)),
        }
    }
}
