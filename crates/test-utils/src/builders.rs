#![allow(dead_code)]

use watchrun::config::{BatchSection, ConfigFile, ConfigSection, RawConfigFile, WatchSection};
use watchrun::types::ExecutionStrategy;

/// Builder for `ConfigFile` to simplify test setup.
pub struct ConfigBuilder {
    raw: RawConfigFile,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            raw: RawConfigFile {
                config: ConfigSection::default(),
                batch: BatchSection::default(),
                watch: WatchSection::default(),
            },
        }
    }

    pub fn strategy(mut self, strategy: ExecutionStrategy) -> Self {
        self.raw.config.strategy = strategy;
        self
    }

    pub fn debounce_ms(mut self, ms: u64) -> Self {
        self.raw.config.debounce_ms = ms;
        self
    }

    pub fn max_queue_size(mut self, size: usize) -> Self {
        self.raw.config.max_queue_size = size;
        self
    }

    pub fn execution_timeout_ms(mut self, ms: u64) -> Self {
        self.raw.config.execution_timeout_ms = ms;
        self
    }

    pub fn batch_window_ms(mut self, ms: u64) -> Self {
        self.raw.batch.window_ms = ms;
        self
    }

    pub fn dependency_resolution(mut self, enabled: bool) -> Self {
        self.raw.batch.dependency_resolution = enabled;
        self
    }

    pub fn include(mut self, pattern: &str) -> Self {
        self.raw.watch.include.push(pattern.to_string());
        self
    }

    pub fn exclude(mut self, pattern: &str) -> Self {
        self.raw.watch.exclude.push(pattern.to_string());
        self
    }

    pub fn skip_unchanged(mut self, enabled: bool) -> Self {
        self.raw.watch.skip_unchanged = enabled;
        self
    }

    pub fn source_extensions(mut self, exts: &[&str]) -> Self {
        self.raw.watch.source_extensions = exts.iter().map(|e| e.to_string()).collect();
        self
    }

    pub fn build(self) -> ConfigFile {
        ConfigFile::try_from(self.raw).expect("Failed to build valid config from builder")
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
