use crate::settings::Settings;
use thiserror::Error;

const PROFILES_GROUP: &str = "Profiles";
const CURRENT_KEY: &str = "CurrentProfile";
pub const DEFAULT_PROFILE: &str = "Default";

#[derive(Debug, Error)]
pub enum ProfileError {
    #[error("profile \"{name}\" already exists")]
    Duplicate { name: String },
    #[error("no such profile \"{name}\"")]
    Unknown { name: String },
    #[error("profile store: {0}")]
    Persistence(#[source] anyhow::Error),
}

/// Named profiles backed by the settings store. Layout: top-level group
/// `Profiles` with a `CurrentProfile` key and one child group per profile
/// holding `Master0..` and `Plugin0..` entries.
#[derive(Debug)]
pub struct ProfileStore {
    settings: Settings,
    current: String,
}

impl ProfileStore {
    /// Wraps an opened settings store. Ensures at least the "Default"
    /// profile exists and resolves the current profile from the store,
    /// falling back to "Default" when the recorded name is missing or
    /// stale.
    pub fn new(mut settings: Settings) -> Self {
        settings.reset_groups();
        settings.begin_group(PROFILES_GROUP);
        if settings.child_groups().is_empty() {
            settings.ensure_group(DEFAULT_PROFILE);
        }
        let recorded = settings.value(CURRENT_KEY).unwrap_or_default();
        let current = if !recorded.is_empty() && settings.has_group(&recorded) {
            recorded
        } else {
            settings.ensure_group(DEFAULT_PROFILE);
            DEFAULT_PROFILE.to_string()
        };
        settings.reset_groups();
        Self { settings, current }
    }

    pub fn list_profiles(&mut self) -> Vec<String> {
        self.enter_profiles_root();
        let names = self.settings.child_groups();
        self.settings.reset_groups();
        names
    }

    pub fn current_profile(&self) -> &str {
        &self.current
    }

    /// Case-insensitive lookup returning the stored spelling.
    pub fn find(&mut self, name: &str) -> Option<String> {
        self.list_profiles()
            .into_iter()
            .find(|existing| existing.eq_ignore_ascii_case(name))
    }

    /// Creates an empty profile. Does not switch to it.
    pub fn create(&mut self, name: &str) -> Result<(), ProfileError> {
        if let Some(existing) = self.find(name) {
            return Err(ProfileError::Duplicate { name: existing });
        }
        self.enter_profiles_root();
        self.settings.ensure_group(name);
        self.settings.reset_groups();
        self.sync()
    }

    /// Removes a profile. Removing the current profile first falls back
    /// to "Default", creating it empty if needed, so exactly one profile
    /// is always current.
    pub fn delete(&mut self, name: &str) -> Result<(), ProfileError> {
        let canonical = self.find(name).ok_or_else(|| ProfileError::Unknown {
            name: name.to_string(),
        })?;
        let was_current = canonical.eq_ignore_ascii_case(&self.current);

        self.enter_profiles_root();
        self.settings.remove(&canonical);
        if was_current {
            self.settings.ensure_group(DEFAULT_PROFILE);
            self.settings.set_value(CURRENT_KEY, DEFAULT_PROFILE);
            self.current = DEFAULT_PROFILE.to_string();
        }
        self.settings.reset_groups();
        self.sync()
    }

    /// Records `name` as the current profile. The caller is responsible
    /// for flushing the outgoing profile first.
    pub fn set_current(&mut self, name: &str) -> Result<(), ProfileError> {
        let canonical = self.find(name).ok_or_else(|| ProfileError::Unknown {
            name: name.to_string(),
        })?;
        self.enter_profiles_root();
        self.settings.set_value(CURRENT_KEY, &canonical);
        self.settings.reset_groups();
        self.current = canonical;
        self.sync()
    }

    /// Writes a profile's state: masters in activation order, plugins in
    /// eligible-list order. The profile group is cleared first so stale
    /// entries from a longer previous save never survive. Creates the
    /// profile if absent.
    pub fn save(
        &mut self,
        name: &str,
        masters: &[String],
        plugins: &[String],
    ) -> Result<(), ProfileError> {
        let canonical = self.find(name).unwrap_or_else(|| name.to_string());
        self.enter_profiles_root();
        self.settings.begin_group(&canonical);
        self.settings.remove("");
        for (index, master) in masters.iter().enumerate() {
            self.settings.set_value(&format!("Master{index}"), master);
        }
        for (index, plugin) in plugins.iter().enumerate() {
            self.settings.set_value(&format!("Plugin{index}"), plugin);
        }
        self.settings.reset_groups();
        self.sync()
    }

    /// Reads a profile's state back: (masters, plugins), each in save
    /// order. Indices are walked from zero until the first gap, which
    /// re-derives order regardless of key iteration order.
    pub fn load(&mut self, name: &str) -> Result<(Vec<String>, Vec<String>), ProfileError> {
        let canonical = self.find(name).ok_or_else(|| ProfileError::Unknown {
            name: name.to_string(),
        })?;
        self.enter_profiles_root();
        self.settings.begin_group(&canonical);
        let masters = self.read_indexed("Master");
        let plugins = self.read_indexed("Plugin");
        self.settings.reset_groups();
        Ok((masters, plugins))
    }

    fn read_indexed(&self, prefix: &str) -> Vec<String> {
        let mut out = Vec::new();
        for index in 0.. {
            match self.settings.value(&format!("{prefix}{index}")) {
                Some(value) => out.push(value),
                None => break,
            }
        }
        out
    }

    fn enter_profiles_root(&mut self) {
        self.settings.reset_groups();
        self.settings.begin_group(PROFILES_GROUP);
    }

    fn sync(&self) -> Result<(), ProfileError> {
        self.settings.sync().map_err(ProfileError::Persistence)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store(dir: &tempfile::TempDir) -> ProfileStore {
        let settings = Settings::open(dir.path().join("profiles.json")).unwrap();
        ProfileStore::new(settings)
    }

    fn strings(names: &[&str]) -> Vec<String> {
        names.iter().map(|name| name.to_string()).collect()
    }

    #[test]
    fn default_profile_is_created_and_current() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store(&dir);
        assert_eq!(store.list_profiles(), [DEFAULT_PROFILE]);
        assert_eq!(store.current_profile(), DEFAULT_PROFILE);
    }

    #[test]
    fn create_rejects_case_insensitive_duplicates() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store(&dir);
        store.create("Alt").unwrap();
        let err = store.create("alt").unwrap_err();
        assert!(matches!(err, ProfileError::Duplicate { .. }));
        assert_eq!(store.list_profiles(), ["Alt", DEFAULT_PROFILE]);
    }

    #[test]
    fn create_does_not_switch() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store(&dir);
        store.create("Alt").unwrap();
        assert_eq!(store.current_profile(), DEFAULT_PROFILE);
    }

    #[test]
    fn save_then_load_round_trips() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store(&dir);
        let masters = strings(&["Tribunal.esm", "Morrowind.esm"]);
        let plugins = strings(&["a.esp", "c.esp", "b.esp"]);
        store.save(DEFAULT_PROFILE, &masters, &plugins).unwrap();
        let (loaded_masters, loaded_plugins) = store.load(DEFAULT_PROFILE).unwrap();
        assert_eq!(loaded_masters, masters);
        assert_eq!(loaded_plugins, plugins);
    }

    #[test]
    fn save_clears_stale_entries() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store(&dir);
        store
            .save(DEFAULT_PROFILE, &[], &strings(&["a.esp", "b.esp", "c.esp"]))
            .unwrap();
        store.save(DEFAULT_PROFILE, &[], &strings(&["b.esp"])).unwrap();
        let (_, plugins) = store.load(DEFAULT_PROFILE).unwrap();
        assert_eq!(plugins, ["b.esp"]);
    }

    #[test]
    fn load_unknown_profile_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store(&dir);
        let err = store.load("Nope").unwrap_err();
        assert!(matches!(err, ProfileError::Unknown { .. }));
    }

    #[test]
    fn delete_unknown_profile_fails() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store(&dir);
        let err = store.delete("Nope").unwrap_err();
        assert!(matches!(err, ProfileError::Unknown { .. }));
    }

    #[test]
    fn deleting_current_profile_falls_back_to_default() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store(&dir);
        store.create("Alt").unwrap();
        store.set_current("Alt").unwrap();
        store.delete("Alt").unwrap();
        assert_eq!(store.current_profile(), DEFAULT_PROFILE);
        assert!(store.list_profiles().contains(&DEFAULT_PROFILE.to_string()));
    }

    #[test]
    fn deleting_default_while_current_recreates_it_empty() {
        let dir = tempfile::tempdir().unwrap();
        let mut store = store(&dir);
        store
            .save(DEFAULT_PROFILE, &strings(&["A.esm"]), &strings(&["a.esp"]))
            .unwrap();
        store.delete(DEFAULT_PROFILE).unwrap();
        assert_eq!(store.current_profile(), DEFAULT_PROFILE);
        let (masters, plugins) = store.load(DEFAULT_PROFILE).unwrap();
        assert!(masters.is_empty());
        assert!(plugins.is_empty());
    }

    #[test]
    fn state_survives_reopen() {
        let dir = tempfile::tempdir().unwrap();
        {
            let mut store = store(&dir);
            store.create("Alt").unwrap();
            store.save("Alt", &strings(&["A.esm"]), &strings(&["b.esp"])).unwrap();
            store.set_current("Alt").unwrap();
        }
        let mut reopened = store(&dir);
        assert_eq!(reopened.current_profile(), "Alt");
        let (masters, plugins) = reopened.load("Alt").unwrap();
        assert_eq!(masters, ["A.esm"]);
        assert_eq!(plugins, ["b.esp"]);
    }
}
