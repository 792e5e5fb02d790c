//! Supervisor (§4.I)
//!
//! Grounded on `watchdog.py`: a component table, a liveness check per
//! component, failure-count tracking with a bounded number of restart
//! attempts, and a cooldown-gated alert. Since every component here lives
//! inside this one process rather than as a separate OS process, "restart"
//! means tearing down and rebuilding the in-process handle (e.g. stopping
//! and restarting the streaming engine thread) rather than `Popen`-ing a
//! new process.

use reqwest::Client;
use std::collections::HashMap;
use std::sync::atomic::Ordering;
use std::sync::Mutex;
use std::time::{Duration, Instant};
use tracing::{error, info, warn};

const MAX_RETRIES: u32 = 3;
const ALERT_COOLDOWN: Duration = Duration::from_secs(300);
const CHECK_TIMEOUT: Duration = Duration::from_secs(5);

/// How a component's liveness is determined.
pub enum ComponentCheck {
    /// Considered healthy if the URL returns a successful HTTP status.
    Url(String),
    /// Considered healthy while the supplied closure returns `true`
    /// (the in-process analogue of `watchdog.py`'s `pgrep`).
    Process(Box<dyn Fn() -> bool + Send + Sync>),
}

pub struct Component {
    pub name: String,
    pub check: ComponentCheck,
    pub critical: bool,
    /// Invoked when a component fails and has retries remaining. `None`
    /// means this component cannot be restarted in-process (alert only).
    pub restart: Option<Box<dyn Fn() + Send + Sync>>,
}

struct ComponentState {
    failure_count: u32,
    last_alert: Option<Instant>,
}

pub struct Supervisor {
    components: Vec<Component>,
    state: Mutex<HashMap<String, ComponentState>>,
    alert_webhook: Option<String>,
    http: Client,
}

impl Supervisor {
    pub fn new(components: Vec<Component>, alert_webhook: Option<String>) -> Self {
        let state = components
            .iter()
            .map(|c| (c.name.clone(), ComponentState { failure_count: 0, last_alert: None }))
            .collect();
        Self { components, state: Mutex::new(state), alert_webhook, http: Client::new() }
    }

    /// Check every component once, handling failures and recoveries.
    /// Returns `true` if every component is currently healthy.
    pub async fn run_checks(&self) -> bool {
        let mut all_ok = true;
        for component in &self.components {
            let healthy = self.check_component(component).await;
            if healthy {
                self.handle_recovery(component).await;
            } else {
                all_ok = false;
                self.handle_failure(component).await;
            }
        }
        all_ok
    }

    /// Run the periodic check loop until `running` flips false, sleeping
    /// `interval` between passes.
    pub async fn run_loop(&self, interval: Duration, running: std::sync::Arc<std::sync::atomic::AtomicBool>) {
        info!("supervisor starting, monitoring {} components", self.components.len());
        while running.load(Ordering::Relaxed) {
            self.run_checks().await;
            tokio::time::sleep(interval).await;
        }
        info!("supervisor stopped");
    }

    /// Run a single component's liveness check by name, for callers (like
    /// `/health`) that want to report the same status the Supervisor acts
    /// on rather than maintaining a second opinion. `None` if no component
    /// with that name is registered.
    pub async fn check_component_by_name(&self, name: &str) -> Option<bool> {
        let component = self.components.iter().find(|c| c.name == name)?;
        Some(self.check_component(component).await)
    }

    async fn check_component(&self, component: &Component) -> bool {
        match &component.check {
            ComponentCheck::Url(url) => {
                let fetch = self.http.get(url).send();
                matches!(tokio::time::timeout(CHECK_TIMEOUT, fetch).await, Ok(Ok(resp)) if resp.status().is_success())
            }
            ComponentCheck::Process(is_alive) => is_alive(),
        }
    }

    async fn handle_failure(&self, component: &Component) {
        let attempt = {
            let mut state = self.state.lock().unwrap();
            let entry = state.get_mut(&component.name).unwrap();
            entry.failure_count += 1;
            entry.failure_count
        };
        warn!("{} FAILED (attempt {}/{})", component.name, attempt, MAX_RETRIES);

        if attempt <= MAX_RETRIES {
            if let Some(restart) = &component.restart {
                info!("restarting {}", component.name);
                restart();
                tokio::time::sleep(Duration::from_secs(2)).await;
                if self.check_component(component).await {
                    info!("{} recovered after restart", component.name);
                    self.state.lock().unwrap().get_mut(&component.name).unwrap().failure_count = 0;
                    return;
                }
            }
        }

        let should_alert = {
            let mut state = self.state.lock().unwrap();
            let entry = state.get_mut(&component.name).unwrap();
            let due = entry.last_alert.map(|t| t.elapsed() > ALERT_COOLDOWN).unwrap_or(true);
            if due {
                entry.last_alert = Some(Instant::now());
            }
            due
        };
        if should_alert {
            self.send_alert(&component.name, component.critical, "DOWN", "failed after restart attempts, manual intervention may be required").await;
        }
    }

    async fn handle_recovery(&self, component: &Component) {
        let was_down = {
            let mut state = self.state.lock().unwrap();
            let entry = state.get_mut(&component.name).unwrap();
            let was_down = entry.failure_count > 0;
            let had_alerted = entry.last_alert.is_some();
            entry.failure_count = 0;
            was_down && had_alerted
        };
        if was_down {
            info!("{} recovered", component.name);
            self.send_alert(&component.name, component.critical, "RECOVERED", "back online").await;
        }
    }

    async fn send_alert(&self, name: &str, critical: bool, status: &str, detail: &str) {
        error!("ALERT: {} {}: {}", name, status, detail);
        let Some(url) = &self.alert_webhook else { return };
        let body = serde_json::json!({
            "component": name,
            "status": status,
            "critical": critical,
            "detail": detail,
        });
        if let Err(e) = self.http.post(url).json(&body).timeout(CHECK_TIMEOUT).send().await {
            warn!("failed to deliver supervisor alert webhook: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[tokio::test]
    async fn process_check_counts_failures_and_recovers() {
        let alive = std::sync::Arc::new(AtomicBool::new(false));
        let alive_for_check = alive.clone();
        let component = Component {
            name: "fake".into(),
            check: ComponentCheck::Process(Box::new(move || alive_for_check.load(Ordering::Relaxed))),
            critical: true,
            restart: None,
        };
        let supervisor = Supervisor::new(vec![component], None);

        assert!(!supervisor.run_checks().await);
        assert!(!supervisor.run_checks().await);
        assert_eq!(supervisor.state.lock().unwrap().get("fake").unwrap().failure_count, 2);

        alive.store(true, Ordering::Relaxed);
        assert!(supervisor.run_checks().await);
        assert_eq!(supervisor.state.lock().unwrap().get("fake").unwrap().failure_count, 0);
    }

    #[tokio::test]
    async fn restart_hook_runs_on_failure_within_retry_budget() {
        let restarted = std::sync::Arc::new(AtomicBool::new(false));
        let restarted_for_closure = restarted.clone();
        let component = Component {
            name: "engine".into(),
            check: ComponentCheck::Process(Box::new(|| false)),
            critical: true,
            restart: Some(Box::new(move || {
                restarted_for_closure.store(true, Ordering::Relaxed);
            })),
        };
        let supervisor = Supervisor::new(vec![component], None);
        supervisor.run_checks().await;
        assert!(restarted.load(Ordering::Relaxed));
    }
}
