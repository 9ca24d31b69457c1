//! # Application Configuration
//!
//! Optional TOML file read at startup. Lookup order:
//!
//! 1. `--config <PATH>`
//! 2. `RENLIB_CONFIG`
//! 3. `renlib.toml` in the working directory, if present
//!
//! Command-line flags override file values.
//!
//! ```toml
//! encoding = "shift_jis"
//! symmetry_seed = 42
//! compress = true
//!
//! [library]
//! max_nodes = 500000
//! hash_table_bits = 18
//! ```

use renlib_core::{LibraryConfig, LibraryError, SymmetryKeys, TextEncoding};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Environment variable naming the configuration file.
pub const CONFIG_ENV: &str = "RENLIB_CONFIG";

/// File picked up from the working directory when nothing else is given.
pub const DEFAULT_CONFIG_FILE: &str = "renlib.toml";

/// Largest configuration file accepted (64 KiB).
const MAX_CONFIG_FILE_SIZE: u64 = 64 * 1024;

/// Settings of one `renlib` invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Engine sizing.
    pub library: LibraryConfig,
    /// WHATWG label of the text encoding used for annotations.
    pub encoding: String,
    /// Seed of the symmetry key table; fresh entropy when absent.
    pub symmetry_seed: Option<u64>,
    /// Wrap FlatRecord output in an LZ4 frame.
    pub compress: bool,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            library: LibraryConfig::default(),
            encoding: TextEncoding::UTF_8.name().to_string(),
            symmetry_seed: None,
            compress: false,
        }
    }
}

impl AppConfig {
    /// Parse TOML text.
    pub fn from_toml_str(text: &str) -> Result<Self, LibraryError> {
        let config: Self = toml::from_str(text)
            .map_err(|e| LibraryError::ConfigError(format!("Invalid configuration: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Read and parse a TOML file.
    pub fn from_file(path: &Path) -> Result<Self, LibraryError> {
        let metadata = std::fs::metadata(path).map_err(|e| {
            LibraryError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        if metadata.len() > MAX_CONFIG_FILE_SIZE {
            return Err(LibraryError::ConfigError(format!(
                "Config file {} bytes exceeds maximum allowed {} bytes",
                metadata.len(),
                MAX_CONFIG_FILE_SIZE
            )));
        }
        let text = std::fs::read_to_string(path).map_err(|e| {
            LibraryError::IoError(format!("Cannot read config '{}': {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Load from the first configured location, or defaults when none.
    pub fn load(explicit: Option<&Path>) -> Result<Self, LibraryError> {
        match resolve_config_path(explicit, std::env::var_os(CONFIG_ENV).map(PathBuf::from)) {
            Some(path) => {
                tracing::debug!(path = %path.display(), "loading configuration");
                Self::from_file(&path)
            }
            None => Ok(Self::default()),
        }
    }

    /// Check the engine sizes and the encoding label.
    pub fn validate(&self) -> Result<(), LibraryError> {
        self.library.validate()?;
        self.text_encoding().map(|_| ())
    }

    pub fn text_encoding(&self) -> Result<TextEncoding, LibraryError> {
        TextEncoding::for_label(&self.encoding)
    }

    /// Key table for this run.
    pub fn symmetry_keys(&self) -> Arc<SymmetryKeys> {
        let keys = match self.symmetry_seed {
            Some(seed) => SymmetryKeys::from_seed(seed),
            None => SymmetryKeys::from_entropy(),
        };
        Arc::new(keys)
    }
}

/// Which configuration file to read, if any.
///
/// The default file only counts when it exists; an explicit or environment
/// path must exist and fails loudly otherwise.
fn resolve_config_path(explicit: Option<&Path>, from_env: Option<PathBuf>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    if let Some(path) = from_env.filter(|p| !p.as_os_str().is_empty()) {
        return Some(path);
    }
    let fallback = PathBuf::from(DEFAULT_CONFIG_FILE);
    fallback.is_file().then_some(fallback)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn empty_file_gives_defaults() {
        assert_eq!(AppConfig::from_toml_str("").unwrap(), AppConfig::default());
    }

    #[test]
    fn partial_library_table_keeps_other_defaults() {
        let config = AppConfig::from_toml_str(
            "encoding = \"shift_jis\"\nsymmetry_seed = 9\n[library]\nmax_nodes = 1000\n",
        )
        .unwrap();
        assert_eq!(config.library.max_nodes, 1000);
        assert_eq!(
            config.library.hash_table_bits,
            LibraryConfig::default().hash_table_bits
        );
        assert_eq!(config.text_encoding().unwrap(), TextEncoding::SHIFT_JIS);
        assert_eq!(config.symmetry_keys().seed(), 9);
    }

    #[test]
    fn invalid_values_are_rejected() {
        assert!(matches!(
            AppConfig::from_toml_str("encoding = \"klingon\""),
            Err(LibraryError::UnknownEncoding(_))
        ));
        assert!(matches!(
            AppConfig::from_toml_str("[library]\nmax_nodes = 0"),
            Err(LibraryError::ConfigError(_))
        ));
        assert!(matches!(
            AppConfig::from_toml_str("compress = \"yes\""),
            Err(LibraryError::ConfigError(_))
        ));
    }

    #[test]
    fn explicit_path_wins() {
        let explicit = Path::new("a.toml");
        assert_eq!(
            resolve_config_path(Some(explicit), Some(PathBuf::from("b.toml"))),
            Some(PathBuf::from("a.toml"))
        );
        assert_eq!(
            resolve_config_path(None, Some(PathBuf::from("b.toml"))),
            Some(PathBuf::from("b.toml"))
        );
    }
}
