//! Settings file support
//!
//! A TOML file can preset any launch option. Every field is optional;
//! command-line flags override whatever the file sets.
//!
//! ```toml
//! workers = 8
//! algorithm = "sha1"
//! charset = "alpha"
//! progress_every = 500000
//! partition = "spread"
//! channel_backend = "crossbeam"
//! pin_cores = true
//! stack_size = 8388608
//! ```

use crate::channel::ChannelBackend;
use crate::charset::Charset;
use crate::error::{Error, Result};
use crate::group::GroupConfig;
use crate::oracle::Algorithm;
use crate::partition::PartitionStrategy;
use serde::{Deserialize, Deserializer};
use std::path::Path;

/// Contents of a settings file
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    /// Number of workers
    pub workers: Option<usize>,

    /// Digest scheme of the target
    pub algorithm: Option<Algorithm>,

    /// Character class used when none is given on the command line.
    /// Unrecognized names select the default class, as on the command line.
    #[serde(deserialize_with = "charset_selector")]
    pub charset: Option<Charset>,

    /// Leaf evaluations between progress lines (0 = off)
    pub progress_every: Option<u64>,

    /// How the alphabet is split across workers
    pub partition: Option<PartitionStrategy>,

    /// Channel implementation
    pub channel_backend: Option<ChannelBackend>,

    /// Pin worker threads to cores
    pub pin_cores: Option<bool>,

    /// Worker thread stack size in bytes
    pub stack_size: Option<usize>,
}

impl Settings {
    /// Read and parse a settings file
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let settings_err = |reason: String| Error::Settings {
            path: path.display().to_string(),
            reason,
        };

        let text = std::fs::read_to_string(path).map_err(|e| settings_err(e.to_string()))?;
        toml::from_str(&text).map_err(|e| settings_err(e.to_string()))
    }

    /// Overlay these settings on a group configuration
    pub fn apply(&self, mut config: GroupConfig) -> GroupConfig {
        if let Some(workers) = self.workers {
            config.num_workers = workers;
        }
        if let Some(interval) = self.progress_every {
            config.progress_interval = interval;
        }
        if let Some(partition) = self.partition {
            config.partition = partition;
        }
        if let Some(backend) = self.channel_backend {
            config.channel_backend = backend;
        }
        if let Some(pin) = self.pin_cores {
            config.enable_cpu_affinity = pin;
        }
        if let Some(size) = self.stack_size {
            config.worker_config = config.worker_config.with_stack_size(size);
        }
        config
    }
}

fn charset_selector<'de, D>(deserializer: D) -> std::result::Result<Option<Charset>, D::Error>
where
    D: Deserializer<'de>,
{
    let selector = Option::<String>::deserialize(deserializer)?;
    Ok(selector.map(|s| Charset::from_selector(Some(s.as_str()))))
}
