//! Dependency health for the probes and startup checks.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::sync::LazyLock;

/// Overall status across checked dependencies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthStatus {
    Healthy,
    Degraded,
    Unhealthy,
}

impl HealthStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Healthy => "healthy",
            Self::Degraded => "degraded",
            Self::Unhealthy => "unhealthy",
        }
    }
}

#[derive(Debug, Clone)]
enum State {
    Unchecked,
    Up { since: DateTime<Utc> },
    Down { since: DateTime<Utc>, reason: String },
}

/// One external dependency.
///
/// Stays out of reports until a binary checks it; the receiver never
/// touches ClickHouse and the aggregator never touches Redpanda.
#[derive(Debug)]
pub struct ComponentHealth {
    name: &'static str,
    state: RwLock<State>,
}

impl ComponentHealth {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            state: RwLock::new(State::Unchecked),
        }
    }

    /// Marks the dependency reachable. Repeated calls keep the original
    /// `since`.
    pub fn set_healthy(&self) {
        let mut state = self.state.write();
        if !matches!(*state, State::Up { .. }) {
            *state = State::Up { since: Utc::now() };
        }
    }

    pub fn set_unhealthy(&self, reason: impl Into<String>) {
        let reason = reason.into();
        let mut state = self.state.write();
        let since = match &*state {
            State::Down { since, .. } => *since,
            _ => Utc::now(),
        };
        *state = State::Down { since, reason };
    }

    pub fn is_healthy(&self) -> bool {
        matches!(*self.state.read(), State::Up { .. })
    }

    pub fn name(&self) -> &'static str {
        self.name
    }

    fn report(&self) -> Option<ComponentHealthReport> {
        let (healthy, since, message) = match &*self.state.read() {
            State::Unchecked => return None,
            State::Up { since } => (true, *since, None),
            State::Down { since, reason } => (false, *since, Some(reason.clone())),
        };

        Some(ComponentHealthReport {
            name: self.name.to_string(),
            healthy,
            since,
            message,
        })
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthReport {
    pub status: HealthStatus,
    pub components: Vec<ComponentHealthReport>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ComponentHealthReport {
    pub name: String,
    pub healthy: bool,
    /// When the component last changed between healthy and unhealthy.
    pub since: DateTime<Utc>,
    pub message: Option<String>,
}

/// The dependencies either binary can have.
pub struct HealthRegistry {
    pub redpanda: ComponentHealth,
    pub clickhouse: ComponentHealth,
}

impl HealthRegistry {
    pub const fn new() -> Self {
        Self {
            redpanda: ComponentHealth::new("redpanda"),
            clickhouse: ComponentHealth::new("clickhouse"),
        }
    }

    pub fn report(&self) -> HealthReport {
        let components: Vec<_> = [&self.redpanda, &self.clickhouse]
            .into_iter()
            .filter_map(ComponentHealth::report)
            .collect();

        let up = components.iter().filter(|c| c.healthy).count();
        let status = match up {
            n if n == components.len() => HealthStatus::Healthy,
            0 => HealthStatus::Unhealthy,
            _ => HealthStatus::Degraded,
        };

        HealthReport { status, components }
    }

    /// The relay only accepts traffic once it can publish.
    pub fn is_ready(&self) -> bool {
        self.redpanda.is_healthy()
    }

    pub fn is_alive(&self) -> bool {
        true
    }
}

impl Default for HealthRegistry {
    fn default() -> Self {
        Self::new()
    }
}

static HEALTH: LazyLock<HealthRegistry> = LazyLock::new(HealthRegistry::new);

/// Process-wide health registry.
pub fn health() -> &'static HealthRegistry {
    &HEALTH
}
