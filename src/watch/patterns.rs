// src/watch/patterns.rs

use std::fmt;

use anyhow::{Context, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::config::WatchSection;

/// Compiled include/exclude glob patterns for the watcher.
///
/// The patterns are relative to the watch root; the watcher passes relative
/// paths (e.g. `"src/main.ts"`) into `matches`. An empty include list means
/// "everything not excluded".
#[derive(Clone)]
pub struct WatchProfile {
    include_set: Option<GlobSet>,
    exclude_set: Option<GlobSet>,
}

impl fmt::Debug for WatchProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("WatchProfile")
            .field("has_includes", &self.include_set.is_some())
            .field("has_excludes", &self.exclude_set.is_some())
            .finish()
    }
}

impl WatchProfile {
    /// Compile the `[watch]` section's patterns.
    pub fn from_config(watch: &WatchSection) -> Result<Self> {
        let include_set = if watch.include.is_empty() {
            None
        } else {
            Some(build_globset(&watch.include).context("building include globset")?)
        };

        let exclude_set = if watch.exclude.is_empty() {
            None
        } else {
            Some(build_globset(&watch.exclude).context("building exclude globset")?)
        };

        Ok(Self {
            include_set,
            exclude_set,
        })
    }

    /// Returns true if the watcher should forward events for the given path
    /// (relative to the watch root).
    pub fn matches(&self, rel_path: &str) -> bool {
        if let Some(include) = &self.include_set {
            if !include.is_match(rel_path) {
                return false;
            }
        }
        if let Some(exclude) = &self.exclude_set {
            if exclude.is_match(rel_path) {
                return false;
            }
        }
        true
    }
}

/// Build a GlobSet from simple string patterns.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        let glob = Glob::new(pat).with_context(|| format!("invalid glob pattern: {pat}"))?;
        builder.add(glob);
    }
    Ok(builder.build()?)
}
