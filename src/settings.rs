use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::{collections::BTreeMap, fs, path::PathBuf};

/// Hierarchical key-value store: nested groups of string keys, navigated
/// with a begin/end group stack, persisted as pretty JSON. Mutations stay
/// in memory until `sync`.
#[derive(Debug)]
pub struct Settings {
    path: PathBuf,
    root: Group,
    stack: Vec<String>,
}

#[derive(Debug, Default, Serialize, Deserialize)]
struct Group {
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    values: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    groups: BTreeMap<String, Group>,
}

impl Settings {
    /// Opens the store at `path`; a missing file is an empty store.
    pub fn open(path: PathBuf) -> Result<Self> {
        let root = if path.exists() {
            let raw = fs::read_to_string(&path)
                .with_context(|| format!("read settings store {}", path.display()))?;
            serde_json::from_str(&raw)
                .with_context(|| format!("parse settings store {}", path.display()))?
        } else {
            Group::default()
        };
        Ok(Self {
            path,
            root,
            stack: Vec::new(),
        })
    }

    pub fn begin_group(&mut self, name: &str) {
        self.stack.push(name.to_string());
    }

    pub fn end_group(&mut self) {
        self.stack.pop();
    }

    /// Current group path, "/"-joined; empty at the root.
    pub fn group(&self) -> String {
        self.stack.join("/")
    }

    pub fn reset_groups(&mut self) {
        self.stack.clear();
    }

    /// Creates an empty child group of the current group if absent.
    /// Navigation alone never creates groups; values do.
    pub fn ensure_group(&mut self, name: &str) {
        self.current_mut().groups.entry(name.to_string()).or_default();
    }

    pub fn set_value(&mut self, key: &str, value: &str) {
        self.current_mut()
            .values
            .insert(key.to_string(), value.to_string());
    }

    pub fn value(&self, key: &str) -> Option<String> {
        self.current()?.values.get(key).cloned()
    }

    pub fn child_keys(&self) -> Vec<String> {
        self.current()
            .map(|group| group.values.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn child_groups(&self) -> Vec<String> {
        self.current()
            .map(|group| group.groups.keys().cloned().collect())
            .unwrap_or_default()
    }

    pub fn has_group(&self, name: &str) -> bool {
        self.current()
            .map(|group| group.groups.contains_key(name))
            .unwrap_or(false)
    }

    /// Removes the given key from the current group; an empty key clears
    /// the whole current group (values and subgroups).
    pub fn remove(&mut self, key: &str) {
        let group = self.current_mut();
        if key.is_empty() {
            group.values.clear();
            group.groups.clear();
        } else {
            group.values.remove(key);
            group.groups.remove(key);
        }
    }

    /// Writes the tree to disk. Failure leaves the on-disk store untouched
    /// apart from ordinary filesystem semantics; the in-memory tree is
    /// unchanged either way.
    pub fn sync(&self) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("create settings dir {}", parent.display()))?;
        }
        let raw = serde_json::to_string_pretty(&self.root).context("serialize settings store")?;
        fs::write(&self.path, raw)
            .with_context(|| format!("write settings store {}", self.path.display()))?;
        Ok(())
    }

    fn current(&self) -> Option<&Group> {
        let mut group = &self.root;
        for name in &self.stack {
            group = group.groups.get(name)?;
        }
        Some(group)
    }

    fn current_mut(&mut self) -> &mut Group {
        let mut group = &mut self.root;
        for name in &self.stack {
            group = group.groups.entry(name.clone()).or_default();
        }
        group
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn group_navigation_and_values() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::open(dir.path().join("store.json")).unwrap();

        settings.begin_group("Profiles");
        settings.set_value("CurrentProfile", "Default");
        settings.begin_group("Default");
        settings.set_value("Master0", "Morrowind.esm");
        assert_eq!(settings.group(), "Profiles/Default");
        settings.end_group();

        assert_eq!(settings.value("CurrentProfile").as_deref(), Some("Default"));
        assert_eq!(settings.child_groups(), ["Default"]);
        settings.reset_groups();
        assert!(settings.value("CurrentProfile").is_none());
    }

    #[test]
    fn reading_an_absent_group_is_empty_not_created() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::open(dir.path().join("store.json")).unwrap();
        settings.begin_group("Nope");
        assert!(settings.value("key").is_none());
        assert!(settings.child_keys().is_empty());
        settings.reset_groups();
        assert!(settings.child_groups().is_empty());
    }

    #[test]
    fn ensure_group_creates_an_empty_child() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::open(dir.path().join("store.json")).unwrap();
        settings.begin_group("Profiles");
        settings.ensure_group("Default");
        assert_eq!(settings.child_groups(), ["Default"]);
        assert!(settings.has_group("Default"));
    }

    #[test]
    fn remove_with_empty_key_clears_the_group() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = Settings::open(dir.path().join("store.json")).unwrap();
        settings.begin_group("Profiles");
        settings.begin_group("Default");
        settings.set_value("Plugin0", "a.esp");
        settings.set_value("Plugin1", "b.esp");
        settings.remove("");
        assert!(settings.child_keys().is_empty());
    }

    #[test]
    fn sync_then_open_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("store.json");

        let mut settings = Settings::open(path.clone()).unwrap();
        settings.begin_group("Profiles");
        settings.set_value("CurrentProfile", "Alt");
        settings.begin_group("Alt");
        settings.set_value("Plugin0", "b.esp");
        settings.sync().unwrap();

        let mut reopened = Settings::open(path).unwrap();
        reopened.begin_group("Profiles");
        assert_eq!(reopened.value("CurrentProfile").as_deref(), Some("Alt"));
        reopened.begin_group("Alt");
        assert_eq!(reopened.value("Plugin0").as_deref(), Some("b.esp"));
    }
}
