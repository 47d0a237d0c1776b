//! Hydration run configuration.

use rowgraph_core::FactoryHints;

/// Options for one hydration run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HydrationConfig {
    /// Ask the entity factory to overwrite the scalar state of instances it
    /// already manages
    pub refresh: bool,
    /// Expected number of root results, used to pre-size the result container
    pub capacity_hint: usize,
    /// Report every managed property the hydrator sets to the change register
    pub notify_change_register: bool,
}

impl Default for HydrationConfig {
    fn default() -> Self {
        Self {
            refresh: false,
            capacity_hint: 0,
            notify_change_register: true,
        }
    }
}

impl HydrationConfig {
    /// Create the default configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the refresh hint.
    pub fn refresh(mut self, refresh: bool) -> Self {
        self.refresh = refresh;
        self
    }

    /// Set the expected root count.
    pub fn capacity_hint(mut self, n: usize) -> Self {
        self.capacity_hint = n;
        self
    }

    /// Enable or disable change-register notifications.
    pub fn notify_change_register(mut self, notify: bool) -> Self {
        self.notify_change_register = notify;
        self
    }

    /// Hints forwarded to the entity factory with every materialization.
    pub fn factory_hints(&self) -> FactoryHints {
        FactoryHints {
            refresh: self.refresh,
        }
    }
}
