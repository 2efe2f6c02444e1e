//! Package locator
//!
//! Resolves logical package names against configured search-path glob
//! patterns, caches opened archives, and maintains two case-folded entry
//! indices (full object name and bare object name) for cross-archive
//! export lookup. `invalidate` closes an archive and purges its index
//! entries, for when the file changes on disk between reads.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::archive::{ArchiveHandle, Entry};
use crate::error::LocateError;

/// Search-path configuration for the locator.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct LocatorConfig {
    /// Glob patterns naming candidate archive files, e.g.
    /// `/opt/client/system/*.u`
    pub search_patterns: Vec<String>,
}

impl LocatorConfig {
    /// Parse a config from TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, LocateError> {
        toml::from_str(text).map_err(|e| LocateError::Config(e.to_string()))
    }

    /// Load a config from a TOML file.
    pub fn from_path(path: &Path) -> Result<Self, LocateError> {
        Self::from_toml_str(&std::fs::read_to_string(path)?)
    }
}

/// An entry paired with the archive that defines it.
#[derive(Clone)]
pub struct LocatedEntry {
    pub archive: ArchiveHandle,
    pub entry: Entry,
}

/// Opens an archive store from a file path. Injected so the locator stays
/// independent of any particular container parser.
pub type ArchiveOpener =
    dyn Fn(&Path) -> Result<ArchiveHandle, LocateError> + Send + Sync;

/// Read a package file and run it through the cryptographic transport,
/// returning clear container bytes. Unencrypted files pass through.
/// Openers build on this before parsing the container layout.
pub fn read_clear_bytes(path: &Path) -> Result<Vec<u8>, LocateError> {
    let raw = std::fs::read(path)?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().to_string())
        .unwrap_or_default();
    let (scheme, clear) = l2pkg_crypt::decrypt(&raw, &file_name)?;
    debug!(path = %path.display(), ?scheme, "package bytes in clear");
    Ok(clear)
}

/// Resolves and caches named archives and their export entries.
///
/// All archive file handles are owned here; `invalidate` is the only path
/// that closes one. The opened-archive cache guarantees at most one open
/// handle per physical file for this locator's lifetime.
pub struct PackageLocator {
    config: LocatorConfig,
    opener: Box<ArchiveOpener>,
    /// Pattern -> matching paths, filled lazily
    listings: Mutex<FxHashMap<String, Vec<PathBuf>>>,
    /// Archive identity -> open handle
    archives: DashMap<String, ArchiveHandle>,
    /// Case-folded full object name -> entries across all opened archives
    by_full_name: DashMap<String, Vec<LocatedEntry>>,
    /// Case-folded bare object name -> entries
    by_bare_name: DashMap<String, Vec<LocatedEntry>>,
}

impl PackageLocator {
    pub fn new(
        config: LocatorConfig,
        opener: impl Fn(&Path) -> Result<ArchiveHandle, LocateError> + Send + Sync + 'static,
    ) -> Self {
        Self {
            config,
            opener: Box::new(opener),
            listings: Mutex::new(FxHashMap::default()),
            archives: DashMap::new(),
            by_full_name: DashMap::new(),
            by_bare_name: DashMap::new(),
        }
    }

    /// Open the archive for a logical package name, or return the cached
    /// handle. The name matches the on-disk file's stem case-insensitively.
    pub fn open_named(&self, name: &str) -> Result<ArchiveHandle, LocateError> {
        let path = self
            .find_file(name)?
            .ok_or_else(|| LocateError::PackageNotFound(name.to_string()))?;
        self.open_path(&path)
    }

    /// Look up an export entry by fully-qualified name, trying the
    /// full-name index first and falling back to the bare-name index.
    /// `class_predicate` disambiguates name collisions across classes.
    pub fn export_entry_for(
        &self,
        full_name: &str,
        class_predicate: &dyn Fn(&Entry) -> bool,
    ) -> Option<LocatedEntry> {
        let key = full_name.to_lowercase();
        if let Some(hits) = self.by_full_name.get(&key) {
            if let Some(found) = hits.iter().find(|l| class_predicate(&l.entry)) {
                return Some(found.clone());
            }
        }
        let bare = match key.rsplit_once('.') {
            Some((_, bare)) => bare.to_string(),
            None => key,
        };
        let hits = self.by_bare_name.get(&bare)?;
        hits.iter().find(|l| class_predicate(&l.entry)).cloned()
    }

    /// Drop the archive for a package name, closing its handle and purging
    /// its entries from both indices. Must not race an in-flight decode
    /// holding the archive; decodes keep their own `Arc` so the handle
    /// stays alive until they finish.
    pub fn invalidate(&self, name: &str) {
        let stale: Vec<String> = self
            .archives
            .iter()
            .filter(|kv| {
                Path::new(kv.key())
                    .file_stem()
                    .map(|stem| stem.to_string_lossy().eq_ignore_ascii_case(name))
                    .unwrap_or(false)
            })
            .map(|kv| kv.key().clone())
            .collect();
        for identity in stale {
            self.archives.remove(&identity);
            self.purge_index(&self.by_full_name, &identity);
            self.purge_index(&self.by_bare_name, &identity);
            // File listings may be stale too
            self.listings.lock().clear();
            debug!(%identity, "archive invalidated");
        }
    }

    /// Number of archives currently open.
    pub fn open_count(&self) -> usize {
        self.archives.len()
    }

    fn purge_index(&self, index: &DashMap<String, Vec<LocatedEntry>>, identity: &str) {
        index.retain(|_, hits| {
            hits.retain(|l| l.archive.identity() != identity);
            !hits.is_empty()
        });
    }

    fn find_file(&self, name: &str) -> Result<Option<PathBuf>, LocateError> {
        let mut listings = self.listings.lock();
        for pattern in &self.config.search_patterns {
            if !listings.contains_key(pattern) {
                let paths = glob::glob(pattern)
                    .map_err(|e| LocateError::BadPattern {
                        pattern: pattern.clone(),
                        message: e.to_string(),
                    })?
                    .filter_map(Result::ok)
                    .collect::<Vec<_>>();
                listings.insert(pattern.clone(), paths);
            }
            let paths = &listings[pattern];
            if let Some(path) = paths.iter().find(|p| {
                p.file_stem()
                    .map(|stem| stem.to_string_lossy().eq_ignore_ascii_case(name))
                    .unwrap_or(false)
            }) {
                return Ok(Some(path.clone()));
            }
        }
        Ok(None)
    }

    fn open_path(&self, path: &Path) -> Result<ArchiveHandle, LocateError> {
        let identity = path.to_string_lossy().to_string();
        if let Some(cached) = self.archives.get(&identity) {
            return Ok(cached.clone());
        }
        let archive = (self.opener)(path)?;
        self.index_archive(&archive);
        self.archives.insert(identity.clone(), archive.clone());
        debug!(%identity, exports = archive.export_table().len(), "archive opened");
        Ok(archive)
    }

    fn index_archive(&self, archive: &ArchiveHandle) {
        for entry in archive.export_table() {
            let located = LocatedEntry {
                archive: archive.clone(),
                entry: entry.clone(),
            };
            self.by_full_name
                .entry(entry.full_name.to_lowercase())
                .or_default()
                .push(located.clone());
            self.by_bare_name
                .entry(entry.object_name.to_lowercase())
                .or_default()
                .push(located);
        }
    }
}
