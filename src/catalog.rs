use crate::esm::MasterReader;
use std::path::{Path, PathBuf};
use thiserror::Error;
use walkdir::WalkDir;

pub const PLUGIN_EXTENSION: &str = "esp";

/// A cataloged plugin file: its name plus the masters it declares, in
/// declaration order. Immutable once built; the whole catalog is rebuilt
/// on rescan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginFile {
    pub name: String,
    pub masters: Vec<String>,
}

/// Non-fatal problems hit during a scan. The catalog is still usable,
/// just smaller than the directory suggests.
#[derive(Debug, Error)]
pub enum ScanWarning {
    #[error("plugin directory {} does not exist", path.display())]
    MissingDirectory { path: PathBuf },
    #[error("skipping {file}: {reason}")]
    UnreadableFile { file: String, reason: String },
}

#[derive(Debug, Default)]
pub struct Catalog {
    pub plugins: Vec<PluginFile>,
    pub warnings: Vec<ScanWarning>,
}

impl Catalog {
    /// Enumerates plugin files in `dir` (file-name order, which becomes
    /// the canonical scan order) and reads each one's declared masters.
    /// Unreadable files are skipped with a warning; a missing directory
    /// yields an empty catalog with a warning.
    pub fn scan(dir: &Path, reader: &dyn MasterReader) -> Self {
        let mut catalog = Catalog::default();

        if !dir.is_dir() {
            catalog.warnings.push(ScanWarning::MissingDirectory {
                path: dir.to_path_buf(),
            });
            return catalog;
        }

        let mut paths: Vec<PathBuf> = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .into_iter()
            .filter_map(|entry| entry.ok())
            .filter(|entry| entry.file_type().is_file())
            .map(|entry| entry.into_path())
            .filter(|path| has_plugin_extension(path))
            .collect();
        paths.sort_by_key(|path| path.file_name().map(|name| name.to_os_string()));

        for path in paths {
            let name = match path.file_name() {
                Some(name) => name.to_string_lossy().to_string(),
                None => continue,
            };
            match reader.read_declared_masters(&path) {
                Ok(masters) => catalog.plugins.push(PluginFile { name, masters }),
                Err(err) => catalog.warnings.push(ScanWarning::UnreadableFile {
                    file: name,
                    reason: err.to_string(),
                }),
            }
        }

        catalog
    }

    pub fn contains(&self, plugin: &str) -> bool {
        self.plugins.iter().any(|entry| entry.name == plugin)
    }
}

fn has_plugin_extension(path: &Path) -> bool {
    path.extension()
        .map(|ext| ext.to_string_lossy().eq_ignore_ascii_case(PLUGIN_EXTENSION))
        .unwrap_or(false)
}
