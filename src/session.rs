use crate::{
    catalog::Catalog,
    config::{self, AppConfig},
    engine::SelectionEngine,
    esm::{EsmFileReader, MasterReader},
    groups::GroupIndex,
    profiles::{ProfileError, ProfileStore},
    registry::MasterRegistry,
    settings::Settings,
};
use anyhow::Result;
use std::path::PathBuf;

#[derive(Debug, Clone)]
pub struct LogEntry {
    pub level: LogLevel,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    Info,
    Warn,
}

/// Owns the whole working state for one run: catalog, master registry,
/// grouping index, selection engine, and the profile store. Constructed
/// on startup, rebuilt wholesale on rescan, flushed before exit. Single
/// threaded; every operation runs to completion.
pub struct Session {
    pub config: AppConfig,
    reader: Box<dyn MasterReader>,
    catalog: Catalog,
    registry: MasterRegistry,
    groups: GroupIndex,
    engine: SelectionEngine,
    store: ProfileStore,
    logs: Vec<LogEntry>,
}

impl Session {
    pub fn initialize(plugin_dir_override: Option<PathBuf>) -> Result<Self> {
        let mut config = AppConfig::load_or_create()?;
        if let Some(dir) = plugin_dir_override {
            config.plugin_dir = dir;
        }
        let settings = Settings::open(config::store_path()?)?;
        Self::with_parts(config, settings, Box::new(EsmFileReader))
    }

    /// Full wiring with injectable settings store and metadata reader.
    pub fn with_parts(
        config: AppConfig,
        settings: Settings,
        reader: Box<dyn MasterReader>,
    ) -> Result<Self> {
        let store = ProfileStore::new(settings);
        let mut session = Self {
            config,
            reader,
            catalog: Catalog::default(),
            registry: MasterRegistry::default(),
            groups: GroupIndex::default(),
            engine: SelectionEngine::default(),
            store,
            logs: Vec::new(),
        };
        session.rebuild_catalog();
        let current = session.store.current_profile().to_string();
        session.apply_profile(&current)?;
        Ok(session)
    }

    /// Rescans the plugin directory and rebuilds registry, groups, and
    /// selection state from scratch, then re-applies the current
    /// profile's saved selection. Unsaved working state is flushed first
    /// so it survives the rebuild.
    pub fn rescan(&mut self) -> Result<()> {
        self.flush()?;
        self.rebuild_catalog();
        let current = self.store.current_profile().to_string();
        self.apply_profile(&current)?;
        Ok(())
    }

    fn rebuild_catalog(&mut self) {
        self.catalog = Catalog::scan(&self.config.plugin_dir, self.reader.as_ref());
        for warning in &self.catalog.warnings {
            self.logs.push(LogEntry {
                level: LogLevel::Warn,
                message: warning.to_string(),
            });
        }
        self.registry = MasterRegistry::from_catalog(&self.catalog);
        self.groups = GroupIndex::from_catalog(&self.catalog);
        self.engine.reset();
        self.push_log(
            LogLevel::Info,
            format!(
                "cataloged {} plugin(s), {} master(s)",
                self.catalog.plugins.len(),
                self.registry.all_masters().len()
            ),
        );
    }

    /// Loads a profile and replaces the working selection with it:
    /// activate exactly its masters, recompute eligibility, then enable
    /// exactly the saved plugin names still present. Saved names no
    /// longer in the catalog are dropped silently.
    fn apply_profile(&mut self, name: &str) -> Result<(), ProfileError> {
        let (masters, plugins) = self.store.load(name)?;
        self.registry.set_active(&masters);
        self.engine.reset();
        self.engine.recompute(&self.groups, &self.registry.active_set());
        self.engine.apply_enabled(&plugins);
        Ok(())
    }

    /// Persists the working state to the current profile.
    pub fn flush(&mut self) -> Result<(), ProfileError> {
        let current = self.store.current_profile().to_string();
        let masters: Vec<String> = self.registry.active_masters().to_vec();
        let plugins = self.engine.enabled_plugins();
        self.store.save(&current, &masters, &plugins)
    }

    /// Returns false if the master is not in the registry.
    pub fn activate_master(&mut self, name: &str) -> bool {
        if !self.registry.contains(name) {
            return false;
        }
        self.registry.activate(name);
        self.engine.recompute(&self.groups, &self.registry.active_set());
        true
    }

    pub fn deactivate_master(&mut self, name: &str) -> bool {
        if !self.registry.contains(name) {
            return false;
        }
        self.registry.deactivate(name);
        self.engine.recompute(&self.groups, &self.registry.active_set());
        true
    }

    /// Returns false if the plugin is not currently eligible.
    pub fn set_enabled(&mut self, plugin: &str, enabled: bool) -> bool {
        if !self.engine.is_eligible(plugin) {
            return false;
        }
        self.engine.set_enabled(plugin, enabled);
        true
    }

    pub fn create_profile(&mut self, name: &str) -> Result<(), ProfileError> {
        self.store.create(name)
    }

    /// Flushes the outgoing profile, records the new current profile, and
    /// applies the target's saved state to the registry and engine.
    pub fn switch_profile(&mut self, name: &str) -> Result<(), ProfileError> {
        let target = self.store.find(name).ok_or_else(|| ProfileError::Unknown {
            name: name.to_string(),
        })?;
        self.flush()?;
        self.store.set_current(&target)?;
        self.apply_profile(&target)
    }

    /// Deletes a profile. If it was current, the store falls back to
    /// "Default" and that profile's state becomes the working state.
    pub fn delete_profile(&mut self, name: &str) -> Result<(), ProfileError> {
        let was_current = self
            .store
            .find(name)
            .map(|canonical| canonical == self.store.current_profile())
            .unwrap_or(false);
        self.store.delete(name)?;
        if was_current {
            let current = self.store.current_profile().to_string();
            self.apply_profile(&current)?;
        }
        Ok(())
    }

    pub fn list_profiles(&mut self) -> Vec<String> {
        self.store.list_profiles()
    }

    pub fn current_profile(&self) -> &str {
        self.store.current_profile()
    }

    pub fn load_profile(&mut self, name: &str) -> Result<(Vec<String>, Vec<String>), ProfileError> {
        self.store.load(name)
    }

    pub fn all_masters(&self) -> &[String] {
        self.registry.all_masters()
    }

    pub fn is_master_active(&self, name: &str) -> bool {
        self.registry.is_active(name)
    }

    pub fn dependency_groups(&self) -> &[crate::groups::DependencyGroup] {
        self.groups.all_groups()
    }

    pub fn group_satisfied(&self, group: &crate::groups::DependencyGroup) -> bool {
        group.is_satisfied_by(&self.registry.active_set())
    }

    pub fn eligible_plugins(&self) -> &[String] {
        self.engine.eligible_plugins()
    }

    pub fn is_plugin_enabled(&self, plugin: &str) -> bool {
        self.engine.is_enabled(plugin)
    }

    pub fn enabled_plugins(&self) -> Vec<String> {
        self.engine.enabled_plugins()
    }

    pub fn plugin_count(&self) -> usize {
        self.catalog.plugins.len()
    }

    pub fn logs(&self) -> &[LogEntry] {
        &self.logs
    }

    fn push_log(&mut self, level: LogLevel, message: String) {
        self.logs.push(LogEntry { level, message });
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::tests::FakeReader;
    use crate::profiles::DEFAULT_PROFILE;
    use std::fs;
    use std::path::Path;

    fn touch(dir: &Path, name: &str) {
        fs::write(dir.join(name), b"").unwrap();
    }

    /// Small catalog: a.esp standalone, b.esp and c.esp both requiring
    /// a.esp.
    fn session(dir: &tempfile::TempDir) -> Session {
        let plugin_dir = dir.path().join("data");
        fs::create_dir_all(&plugin_dir).unwrap();
        touch(&plugin_dir, "a.esp");
        touch(&plugin_dir, "b.esp");
        touch(&plugin_dir, "c.esp");

        let config = AppConfig {
            plugin_dir,
            confirm_profile_delete: true,
        };
        let settings = Settings::open(dir.path().join("profiles.json")).unwrap();
        let reader = FakeReader::new(&[
            ("a.esp", &[]),
            ("b.esp", &["a.esp"]),
            ("c.esp", &["a.esp"]),
        ]);
        Session::with_parts(config, settings, Box::new(reader)).unwrap()
    }

    #[test]
    fn startup_lands_on_default_profile_with_masterless_plugins() {
        let dir = tempfile::tempdir().unwrap();
        let session = session(&dir);
        assert_eq!(session.current_profile(), DEFAULT_PROFILE);
        assert_eq!(session.eligible_plugins(), ["a.esp"]);
        assert_eq!(session.all_masters(), ["a.esp"]);
    }

    #[test]
    fn master_toggle_cycle_retains_enabled_flags() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(&dir);

        assert!(session.activate_master("a.esp"));
        assert_eq!(session.eligible_plugins(), ["a.esp", "b.esp", "c.esp"]);
        assert!(!session.is_plugin_enabled("b.esp"));

        assert!(session.set_enabled("b.esp", true));
        assert!(session.deactivate_master("a.esp"));
        assert_eq!(session.eligible_plugins(), ["a.esp"]);

        assert!(session.activate_master("a.esp"));
        assert!(session.is_plugin_enabled("b.esp"));
        assert!(!session.is_plugin_enabled("c.esp"));
    }

    #[test]
    fn unknown_master_and_ineligible_plugin_are_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(&dir);
        assert!(!session.activate_master("z.esm"));
        assert!(!session.set_enabled("b.esp", true));
    }

    #[test]
    fn switch_flushes_outgoing_profile() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(&dir);

        session.activate_master("a.esp");
        session.set_enabled("b.esp", true);
        session.create_profile("Alt").unwrap();
        session.switch_profile("Alt").unwrap();

        assert_eq!(session.current_profile(), "Alt");
        assert!(session.enabled_plugins().is_empty());

        let (masters, plugins) = session.load_profile(DEFAULT_PROFILE).unwrap();
        assert_eq!(masters, ["a.esp"]);
        assert_eq!(plugins, ["b.esp"]);
    }

    #[test]
    fn switch_away_and_back_reproduces_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(&dir);

        session.activate_master("a.esp");
        session.set_enabled("b.esp", true);
        session.create_profile("Alt").unwrap();
        session.switch_profile("Alt").unwrap();
        session.switch_profile(DEFAULT_PROFILE).unwrap();

        assert!(session.is_master_active("a.esp"));
        assert_eq!(session.eligible_plugins(), ["a.esp", "b.esp", "c.esp"]);
        assert_eq!(session.enabled_plugins(), ["b.esp"]);
    }

    #[test]
    fn switch_to_unknown_profile_mutates_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(&dir);
        session.activate_master("a.esp");
        session.set_enabled("c.esp", true);

        let err = session.switch_profile("Nope").unwrap_err();
        assert!(matches!(err, ProfileError::Unknown { .. }));
        assert_eq!(session.current_profile(), DEFAULT_PROFILE);
        assert_eq!(session.enabled_plugins(), ["c.esp"]);
    }

    #[test]
    fn deleting_current_profile_applies_the_fallback() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(&dir);

        session.create_profile("Alt").unwrap();
        session.switch_profile("Alt").unwrap();
        session.activate_master("a.esp");
        session.set_enabled("b.esp", true);

        session.delete_profile("Alt").unwrap();
        assert_eq!(session.current_profile(), DEFAULT_PROFILE);
        assert!(session.list_profiles().contains(&DEFAULT_PROFILE.to_string()));
        assert!(session.enabled_plugins().is_empty());
    }

    #[test]
    fn rescan_preserves_surviving_enabled_state() {
        let dir = tempfile::tempdir().unwrap();
        let mut session = session(&dir);

        session.activate_master("a.esp");
        session.set_enabled("c.esp", true);

        // c.esp disappears from the plugin directory before the rescan.
        fs::remove_file(dir.path().join("data").join("c.esp")).unwrap();
        session.rescan().unwrap();

        assert!(session.is_master_active("a.esp"));
        assert_eq!(session.eligible_plugins(), ["a.esp", "b.esp"]);
        assert!(session.enabled_plugins().is_empty());

        // The vanished plugin stays in the saved profile but is not
        // resurrected into the working state.
        let (_, plugins) = session.load_profile(DEFAULT_PROFILE).unwrap();
        assert_eq!(plugins, ["c.esp"]);
    }
}
