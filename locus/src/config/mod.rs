//! User configuration stored in `~/.locus/config.ini`.
//!
//! The file is split into one `[section]` per component. Missing keys keep
//! their defaults, so a partial file is always valid.
//!
//! # Example
//!
//! ```no_run
//! use locus::config::ConfigFile;
//!
//! let file = ConfigFile::load()?;
//! let session_config = file.session_config()?;
//! let store_config = file.store_config();
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

mod defaults;
mod file;
mod parser;
mod runtime;
mod settings;
mod writer;

pub use defaults::*;
pub use file::{config_directory, config_file_path, ConfigFileError};
pub use settings::{
    ConfigFile, EscalationSettings, HistorySettings, IngestSettings, LoggingSettings,
    ProximitySettings, PublishSettings, StabilizerSettings, StoreSettings, WatchSettings,
};
