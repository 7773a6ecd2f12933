//! # formrelay-settings
//!
//! Process-wide configuration, read once at startup.
//!
//! Settings are loaded from layered sources (in priority order, lowest first):
//! 1. **Compiled defaults**: [`RelaySettings::default()`]
//! 2. **Settings file**: optional JSON file, deep-merged over defaults
//! 3. **`.env` file**: loaded into the process environment if present
//! 4. **Environment variables**: `HOST`, `PORT`, `LOG_LEVEL`, `RELOAD`, ...
//!
//! CLI flags are applied on top by the binary.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{apply_env_overrides, deep_merge, load_settings, load_settings_from_path};
pub use types::RelaySettings;
