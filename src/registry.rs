use crate::catalog::Catalog;
use std::collections::HashSet;

/// All master names seen in the current catalog scan, plus which of them
/// the user has activated. Names never leave the registry short of a full
/// rescan.
#[derive(Debug, Default)]
pub struct MasterRegistry {
    names: Vec<String>,
    active: Vec<String>,
}

impl MasterRegistry {
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let mut seen = HashSet::new();
        let mut names = Vec::new();
        for plugin in &catalog.plugins {
            for master in &plugin.masters {
                if seen.insert(master.clone()) {
                    names.push(master.clone());
                }
            }
        }
        names.sort();
        Self {
            names,
            active: Vec::new(),
        }
    }

    /// Alphabetical listing for display.
    pub fn all_masters(&self) -> &[String] {
        &self.names
    }

    pub fn contains(&self, name: &str) -> bool {
        self.names.iter().any(|known| known == name)
    }

    pub fn is_active(&self, name: &str) -> bool {
        self.active.iter().any(|active| active == name)
    }

    /// Idempotent; unknown names are ignored.
    pub fn activate(&mut self, name: &str) {
        if self.contains(name) && !self.is_active(name) {
            self.active.push(name.to_string());
        }
    }

    pub fn deactivate(&mut self, name: &str) {
        self.active.retain(|active| active != name);
    }

    /// Replaces the activation set wholesale, e.g. on profile load.
    /// Activation order follows the given order.
    pub fn set_active(&mut self, names: &[String]) {
        self.active.clear();
        for name in names {
            self.activate(name);
        }
    }

    /// Activation order, which is the order masters are persisted in.
    pub fn active_masters(&self) -> &[String] {
        &self.active
    }

    pub fn active_set(&self) -> HashSet<String> {
        self.active.iter().cloned().collect()
    }
}
