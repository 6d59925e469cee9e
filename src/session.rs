//! Local fallback cache for the signed-in institution's display name
//!
//! Screens greet the operator with their school's name. When the profile
//! fetch has not landed yet (or failed), the name last seen is recovered
//! from a small JSON file keyed the same way the console's browser
//! storage keyed it. The cache is best-effort: a missing or corrupt file
//! simply means there is no fallback name.

use log::warn;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::Error;

#[derive(Debug, Default, Serialize, Deserialize)]
struct CacheFile {
    #[serde(rename = "institutionName")]
    institution_name: Option<String>,
}

/// File-backed fallback store for the institution display name
#[derive(Debug)]
pub struct InstitutionCache {
    path: PathBuf,
    institution_name: Option<String>,
}

impl InstitutionCache {
    /// Load the cache from `path`. A missing or unreadable file yields an
    /// empty cache rather than an error.
    pub fn load(path: &Path) -> Self {
        let institution_name = match std::fs::read_to_string(path) {
            Ok(raw) => match serde_json::from_str::<CacheFile>(&raw) {
                Ok(cache) => cache.institution_name,
                Err(e) => {
                    warn!("institution cache at {} is corrupt: {}", path.display(), e);
                    None
                }
            },
            Err(_) => None,
        };
        Self {
            path: path.to_path_buf(),
            institution_name,
        }
    }

    /// The cached display name, if any.
    pub fn institution_name(&self) -> Option<&str> {
        self.institution_name.as_deref()
    }

    /// The cached display name, or `fallback` when nothing is cached.
    pub fn display_name_or(&self, fallback: &str) -> String {
        self.institution_name
            .clone()
            .unwrap_or_else(|| fallback.to_string())
    }

    /// Remember a freshly fetched display name. Call [`save`] to persist.
    ///
    /// [`save`]: InstitutionCache::save
    pub fn remember(&mut self, name: &str) {
        self.institution_name = Some(name.to_string());
    }

    /// Forget the cached name (e.g. on sign-out).
    pub fn clear(&mut self) {
        self.institution_name = None;
    }

    /// Write the cache back to its file.
    pub fn save(&self) -> Result<(), Error> {
        let cache = CacheFile {
            institution_name: self.institution_name.clone(),
        };
        let raw = serde_json::to_string(&cache)?;
        std::fs::write(&self.path, raw)?;
        Ok(())
    }
}
