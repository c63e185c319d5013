// Health Domain Model

use std::collections::BTreeMap;

/// Reachability of one dependency in one probe cycle
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DependencyStatus {
    Up,
    Down(String),
}

impl DependencyStatus {
    pub fn is_up(&self) -> bool {
        matches!(self, DependencyStatus::Up)
    }
}

/// Result of one probe cycle, keyed by dependency name
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HealthState {
    dependencies: BTreeMap<String, DependencyStatus>,
}

impl HealthState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, name: impl Into<String>, status: DependencyStatus) {
        self.dependencies.insert(name.into(), status);
    }

    pub fn status(&self, name: &str) -> Option<&DependencyStatus> {
        self.dependencies.get(name)
    }

    pub fn all_up(&self) -> bool {
        self.dependencies.values().all(DependencyStatus::is_up)
    }

    pub fn down(&self) -> impl Iterator<Item = &str> {
        self.dependencies
            .iter()
            .filter(|(_, status)| !status.is_up())
            .map(|(name, _)| name.as_str())
    }

    /// Same up/down picture, ignoring failure details
    pub fn same_availability(&self, other: &HealthState) -> bool {
        self.dependencies.len() == other.dependencies.len()
            && self
                .dependencies
                .iter()
                .all(|(name, status)| other.status(name).map(|s| s.is_up()) == Some(status.is_up()))
    }

    /// Alert text: one line per dependency
    pub fn summary(&self) -> String {
        let mut lines = Vec::with_capacity(self.dependencies.len() + 1);
        lines.push(if self.all_up() {
            "All services are up".to_string()
        } else {
            "Some services are down".to_string()
        });
        for (name, status) in &self.dependencies {
            match status {
                DependencyStatus::Up => lines.push(format!("{}: up", name)),
                DependencyStatus::Down(reason) => lines.push(format!("{}: down ({})", name, reason)),
            }
        }
        lines.join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_summary_lists_every_dependency() {
        let mut state = HealthState::new();
        state.record("redis", DependencyStatus::Up);
        state.record("broker", DependencyStatus::Down("timed out".to_string()));

        assert!(!state.all_up());
        assert_eq!(state.down().collect::<Vec<_>>(), vec!["broker"]);
        assert_eq!(
            state.summary(),
            "Some services are down\nbroker: down (timed out)\nredis: up"
        );
    }

    #[test]
    fn test_same_availability_ignores_reason() {
        let mut a = HealthState::new();
        a.record("redis", DependencyStatus::Down("refused".to_string()));
        let mut b = HealthState::new();
        b.record("redis", DependencyStatus::Down("timed out".to_string()));
        assert!(a.same_availability(&b));

        b.record("redis", DependencyStatus::Up);
        assert!(!a.same_availability(&b));
    }
}
