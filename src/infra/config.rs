//! Configuration management infrastructure.
//!
//! Engine defaults (digest, content cipher, base64 framing, stream chunk
//! size) can be persisted to a TOML file and exported/imported as TOML or
//! JSON. Every load and import is validated before it is accepted.

use crate::domain::constants::{BASE64_LINE_LENGTH, STREAM_BUFFER_SIZE};
use crate::domain::crypto::{CipherAlgorithm, DigestAlgorithm};
use crate::infra::error::{Pkcs7Error, Pkcs7Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Engine configuration with all message-building defaults
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfiguration {
    /// Digest used for new signers and digested messages
    pub default_digest_algorithm: String,

    /// Content-encryption cipher for new envelopes
    pub default_cipher_algorithm: String,

    /// Base64 line width for PEM and S/MIME output (0 = single line)
    pub base64_line_length: usize,

    /// Chunk size used when pumping data through a filter chain
    pub stream_buffer_size: usize,

    /// Whether signers advertise an SMIMECapabilities attribute
    pub include_smime_capabilities: bool,
}

impl Default for EngineConfiguration {
    fn default() -> Self {
        Self {
            default_digest_algorithm: "sha256".to_string(),
            default_cipher_algorithm: "aes-256-cbc".to_string(),
            base64_line_length: BASE64_LINE_LENGTH,
            stream_buffer_size: STREAM_BUFFER_SIZE,
            include_smime_capabilities: true,
        }
    }
}

impl EngineConfiguration {
    pub fn digest_algorithm(&self) -> Pkcs7Result<DigestAlgorithm> {
        self.default_digest_algorithm.parse().map_err(|_| {
            Pkcs7Error::ConfigurationError(format!(
                "Invalid digest algorithm: {}",
                self.default_digest_algorithm
            ))
        })
    }

    pub fn cipher_algorithm(&self) -> Pkcs7Result<CipherAlgorithm> {
        self.default_cipher_algorithm.parse().map_err(|_| {
            Pkcs7Error::ConfigurationError(format!(
                "Invalid cipher algorithm: {}",
                self.default_cipher_algorithm
            ))
        })
    }

    pub fn validate(&self) -> Pkcs7Result<()> {
        self.digest_algorithm()?;
        self.cipher_algorithm()?;

        if self.stream_buffer_size == 0 {
            return Err(Pkcs7Error::ConfigurationError(
                "Stream buffer size must be greater than 0".to_string(),
            ));
        }

        if self.base64_line_length % 4 != 0 {
            return Err(Pkcs7Error::ConfigurationError(format!(
                "Base64 line length must be a multiple of 4, got {}",
                self.base64_line_length
            )));
        }

        Ok(())
    }
}

/// Configuration manager for handling config files
pub struct ConfigManager {
    config_path: PathBuf,
}

impl ConfigManager {
    /// Create a new configuration manager with default path
    pub fn new() -> Pkcs7Result<Self> {
        let config_path = Self::default_config_path()?;
        Ok(Self { config_path })
    }

    /// Create a configuration manager with custom path
    pub fn with_path<P: AsRef<Path>>(path: P) -> Self {
        Self {
            config_path: path.as_ref().to_path_buf(),
        }
    }

    /// Get the default configuration file path
    pub fn default_config_path() -> Pkcs7Result<PathBuf> {
        if let Some(config_dir) = dirs::config_dir() {
            Ok(config_dir.join("pkcs7-engine").join("config.toml"))
        } else {
            Ok(PathBuf::from("pkcs7-engine-config.toml"))
        }
    }

    /// Load configuration from file, creating default if it doesn't exist
    pub fn load_or_create_default(&self) -> Pkcs7Result<EngineConfiguration> {
        if self.config_path.exists() {
            self.load()
        } else {
            log::info!(
                "Configuration file not found, creating default: {}",
                self.config_path.display()
            );
            let default_config = EngineConfiguration::default();
            self.save(&default_config)?;
            Ok(default_config)
        }
    }

    /// Load configuration from file
    pub fn load(&self) -> Pkcs7Result<EngineConfiguration> {
        log::info!("Loading configuration from: {}", self.config_path.display());

        let content = fs::read_to_string(&self.config_path).map_err(|e| {
            Pkcs7Error::ConfigurationError(format!(
                "Failed to read config file {}: {}",
                self.config_path.display(),
                e
            ))
        })?;

        let config: EngineConfiguration = toml::from_str(&content).map_err(|e| {
            Pkcs7Error::ConfigurationError(format!("Failed to parse config file: {e}"))
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Save configuration to file
    pub fn save(&self, config: &EngineConfiguration) -> Pkcs7Result<()> {
        log::info!("Saving configuration to: {}", self.config_path.display());

        if let Some(parent) = self.config_path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                Pkcs7Error::ConfigurationError(format!(
                    "Failed to create config directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }

        let content = toml::to_string_pretty(config).map_err(|e| {
            Pkcs7Error::ConfigurationError(format!("Failed to serialize config: {e}"))
        })?;

        fs::write(&self.config_path, content).map_err(|e| {
            Pkcs7Error::ConfigurationError(format!(
                "Failed to write config file {}: {}",
                self.config_path.display(),
                e
            ))
        })?;

        log::debug!("Configuration saved");
        Ok(())
    }

    /// Update a specific configuration value
    pub fn update_value(&self, key: &str, value: &str) -> Pkcs7Result<()> {
        let mut config = self.load()?;

        match key {
            "default_digest_algorithm" => config.default_digest_algorithm = value.to_string(),
            "default_cipher_algorithm" => config.default_cipher_algorithm = value.to_string(),
            "base64_line_length" => {
                config.base64_line_length = value.parse().map_err(|_| {
                    Pkcs7Error::ConfigurationError(format!("Invalid line length: {value}"))
                })?;
            }
            "stream_buffer_size" => {
                config.stream_buffer_size = value.parse().map_err(|_| {
                    Pkcs7Error::ConfigurationError(format!("Invalid buffer size: {value}"))
                })?;
            }
            "include_smime_capabilities" => {
                config.include_smime_capabilities = value.parse().map_err(|_| {
                    Pkcs7Error::ConfigurationError(format!("Invalid boolean value: {value}"))
                })?;
            }
            _ => {
                return Err(Pkcs7Error::ConfigurationError(format!(
                    "Unknown configuration key: {key}"
                )));
            }
        }

        config.validate()?;
        self.save(&config)
    }

    /// Get the configuration file path
    #[must_use]
    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    /// Export configuration as a portable format
    pub fn export_config(&self, format: ExportFormat) -> Pkcs7Result<String> {
        let config = self.load()?;

        match format {
            ExportFormat::Toml => toml::to_string_pretty(&config)
                .map_err(|e| Pkcs7Error::ConfigurationError(format!("TOML export failed: {e}"))),
            ExportFormat::Json => serde_json::to_string_pretty(&config)
                .map_err(|e| Pkcs7Error::ConfigurationError(format!("JSON export failed: {e}"))),
        }
    }

    /// Import configuration from a string
    pub fn import_config(&self, content: &str, format: ExportFormat) -> Pkcs7Result<()> {
        let config: EngineConfiguration = match format {
            ExportFormat::Toml => toml::from_str(content).map_err(|e| {
                Pkcs7Error::ConfigurationError(format!("TOML import failed: {e}"))
            })?,
            ExportFormat::Json => serde_json::from_str(content).map_err(|e| {
                Pkcs7Error::ConfigurationError(format!("JSON import failed: {e}"))
            })?,
        };

        config.validate()?;
        self.save(&config)
    }
}

/// Configuration export/import formats
#[derive(Debug, Clone, Copy)]
pub enum ExportFormat {
    Toml,
    Json,
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_default_configuration() {
        let config = EngineConfiguration::default();
        assert_eq!(config.digest_algorithm().unwrap(), DigestAlgorithm::Sha256);
        assert_eq!(config.cipher_algorithm().unwrap(), CipherAlgorithm::Aes256Cbc);
        assert_eq!(config.base64_line_length, 64);
        config.validate().unwrap();
    }

    #[test]
    fn test_config_serialization() {
        let config = EngineConfiguration::default();
        let toml_str = toml::to_string(&config).unwrap();
        let deserialized: EngineConfiguration = toml::from_str(&toml_str).unwrap();
        assert_eq!(config, deserialized);
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config: EngineConfiguration = toml::from_str("default_digest_algorithm = \"sha1\"\n").unwrap();
        assert_eq!(config.digest_algorithm().unwrap(), DigestAlgorithm::Sha1);
        assert_eq!(config.stream_buffer_size, STREAM_BUFFER_SIZE);
    }

    #[test]
    fn test_config_manager_with_temp_path() {
        let temp_dir = TempDir::new().unwrap();
        let config_path = temp_dir.path().join("test_config.toml");
        let manager = ConfigManager::with_path(&config_path);

        let config = manager.load_or_create_default().unwrap();
        assert!(config_path.exists());

        let loaded_config = manager.load().unwrap();
        assert_eq!(config, loaded_config);
    }

    #[test]
    fn test_update_value_rejects_unknown_cipher() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(temp_dir.path().join("c.toml"));
        manager.load_or_create_default().unwrap();

        manager.update_value("default_cipher_algorithm", "des-ede3-cbc").unwrap();
        assert_eq!(
            manager.load().unwrap().cipher_algorithm().unwrap(),
            CipherAlgorithm::DesEde3Cbc
        );

        let err = manager.update_value("default_cipher_algorithm", "rc2-cbc").unwrap_err();
        assert!(matches!(err, Pkcs7Error::ConfigurationError(_)));
        assert!(manager.update_value("no_such_key", "1").is_err());
    }

    #[test]
    fn test_export_import_json() {
        let temp_dir = TempDir::new().unwrap();
        let manager = ConfigManager::with_path(temp_dir.path().join("c.toml"));
        manager.load_or_create_default().unwrap();
        let json = manager.export_config(ExportFormat::Json).unwrap();

        let other = ConfigManager::with_path(temp_dir.path().join("d.toml"));
        other.import_config(&json, ExportFormat::Json).unwrap();
        assert_eq!(other.load().unwrap(), manager.load().unwrap());
    }
}
