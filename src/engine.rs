use crate::groups::GroupIndex;
use std::collections::{HashMap, HashSet};

/// Computes which plugins are selectable for the current master activation
/// set and tracks each plugin's enabled flag.
///
/// Flags live in a side table keyed by plugin name, not on the eligible
/// list itself, so deactivating a master and bringing it back restores the
/// prior checked state instead of resetting it. A flag starts as false the
/// first time its plugin becomes eligible and is only changed after that
/// by `set_enabled`.
#[derive(Debug, Default)]
pub struct SelectionEngine {
    eligible: Vec<String>,
    enabled: HashMap<String, bool>,
}

impl SelectionEngine {
    /// Rebuilds the eligible list: every group whose masters are all in
    /// `active` contributes its plugins, groups in first-seen order,
    /// plugins in scan order, deduplicated by name with the first
    /// occurrence winning. The resulting order is the game load order, so
    /// it must be deterministic for given inputs.
    pub fn recompute(&mut self, index: &GroupIndex, active: &HashSet<String>) {
        self.eligible.clear();
        let mut seen = HashSet::new();
        for group in index.all_groups() {
            if !group.is_satisfied_by(active) {
                continue;
            }
            for plugin in &group.plugins {
                if seen.insert(plugin.clone()) {
                    self.enabled.entry(plugin.clone()).or_insert(false);
                    self.eligible.push(plugin.clone());
                }
            }
        }
    }

    pub fn eligible_plugins(&self) -> &[String] {
        &self.eligible
    }

    pub fn is_eligible(&self, plugin: &str) -> bool {
        self.eligible.iter().any(|name| name == plugin)
    }

    pub fn is_enabled(&self, plugin: &str) -> bool {
        self.is_eligible(plugin) && self.enabled.get(plugin).copied().unwrap_or(false)
    }

    /// No-op unless the plugin is currently eligible.
    pub fn set_enabled(&mut self, plugin: &str, enabled: bool) {
        if self.is_eligible(plugin) {
            self.enabled.insert(plugin.to_string(), enabled);
        }
    }

    /// Enabled plugins in eligible-list order.
    pub fn enabled_plugins(&self) -> Vec<String> {
        self.eligible
            .iter()
            .filter(|plugin| self.enabled.get(*plugin).copied().unwrap_or(false))
            .cloned()
            .collect()
    }

    /// Applies a loaded profile's enabled set on top of the current
    /// eligible list. Names no longer eligible (or gone from the catalog
    /// entirely) are dropped silently; everything else is forced to the
    /// loaded state.
    pub fn apply_enabled(&mut self, plugins: &[String]) {
        let wanted: HashSet<&String> = plugins.iter().collect();
        for plugin in self.eligible.clone() {
            let enabled = wanted.contains(&plugin);
            self.enabled.insert(plugin, enabled);
        }
    }

    /// Drops all flag state, e.g. when the catalog itself was rebuilt.
    pub fn reset(&mut self) {
        self.eligible.clear();
        self.enabled.clear();
    }
}
