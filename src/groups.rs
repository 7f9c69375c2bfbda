use crate::catalog::Catalog;
use std::collections::HashMap;

/// Canonical key for a set of masters: deduplicated, sorted, comma-joined.
/// Declaration order never affects the key; zero masters yields "".
pub fn group_key(masters: &[String]) -> String {
    let mut sorted: Vec<&str> = masters.iter().map(String::as_str).collect();
    sorted.sort_unstable();
    sorted.dedup();
    sorted.join(",")
}

/// One dependency group: the plugins that require exactly this master set,
/// in catalog scan order.
#[derive(Debug, Clone)]
pub struct DependencyGroup {
    pub key: String,
    pub masters: Vec<String>,
    pub plugins: Vec<String>,
}

impl DependencyGroup {
    /// Exact-name subset test against the active set. Matching is per
    /// whole name: a master whose name merely contains another's must
    /// never satisfy it.
    pub fn is_satisfied_by(&self, active: &std::collections::HashSet<String>) -> bool {
        self.masters.iter().all(|master| active.contains(master))
    }
}

/// Groups in first-seen order, with a key index for lookups. Rebuilt
/// wholesale on every catalog scan; groups are never merged or split
/// in between.
#[derive(Debug, Default)]
pub struct GroupIndex {
    groups: Vec<DependencyGroup>,
    by_key: HashMap<String, usize>,
}

impl GroupIndex {
    pub fn from_catalog(catalog: &Catalog) -> Self {
        let mut index = GroupIndex::default();
        for plugin in &catalog.plugins {
            let key = group_key(&plugin.masters);
            let slot = match index.by_key.get(&key) {
                Some(slot) => *slot,
                None => {
                    let mut masters: Vec<String> = plugin.masters.clone();
                    masters.sort_unstable();
                    masters.dedup();
                    index.groups.push(DependencyGroup {
                        key: key.clone(),
                        masters,
                        plugins: Vec::new(),
                    });
                    index.by_key.insert(key, index.groups.len() - 1);
                    index.groups.len() - 1
                }
            };
            index.groups[slot].plugins.push(plugin.name.clone());
        }
        index
    }

    /// Plugins grouped under the given master set; empty if no plugin
    /// declares exactly that set.
    pub fn group_for(&self, masters: &[String]) -> &[String] {
        let key = group_key(masters);
        self.by_key
            .get(&key)
            .map(|slot| self.groups[*slot].plugins.as_slice())
            .unwrap_or(&[])
    }

    pub fn all_groups(&self) -> &[DependencyGroup] {
        &self.groups
    }
}
