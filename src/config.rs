use std::path::PathBuf;

use anyhow::Result;
use config::{Config, Environment, File};
use serde::Deserialize;

use crate::availability::{SLOT_LENGTH_MINUTES, WINDOW_SIZE};

/// Database used when neither `DATABASE_URL` nor a config file sets one.
pub const DEFAULT_DATABASE_URL: &str = "sqlite://appointment-slots.db";

#[derive(Debug, Deserialize, Clone)]
pub struct AppConfig {
    pub database: DatabaseConfig,
    pub availability: AvailabilityConfig,
    pub export: ExportConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub url: String,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            url: DEFAULT_DATABASE_URL.to_string(),
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct AvailabilityConfig {
    pub window_days: u32,
    pub slot_length_minutes: i64,
}

impl Default for AvailabilityConfig {
    fn default() -> Self {
        Self {
            window_days: WINDOW_SIZE,
            slot_length_minutes: SLOT_LENGTH_MINUTES,
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
pub struct ExportConfig {
    pub output_dir: PathBuf,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
        }
    }
}

impl AppConfig {
    pub fn load() -> Result<Self> {
        // Load .env file (silently ignore if not present)
        let _ = dotenvy::dotenv();

        let database_url =
            std::env::var("DATABASE_URL").unwrap_or_else(|_| DEFAULT_DATABASE_URL.to_string());

        let config_dir = dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("appointment-slots");

        let builder = Config::builder()
            // 1. Defaults
            .set_default("database.url", database_url)?
            .set_default("availability.window_days", i64::from(WINDOW_SIZE))?
            .set_default("availability.slot_length_minutes", SLOT_LENGTH_MINUTES)?
            .set_default("export.output_dir", ".")?
            // 2. Local config file (optional, lowest priority)
            .add_source(File::from(PathBuf::from("config.toml")).required(false))
            // 3. User config directory (optional, overrides local)
            .add_source(File::from(config_dir.join("config.toml")).required(false))
            // 4. Environment variables (SLOTS__AVAILABILITY__WINDOW_DAYS=14)
            .add_source(Environment::with_prefix("SLOTS").separator("__"));

        let s = builder.build()?;
        let config: AppConfig = s.try_deserialize()?;
        config.availability.validate()?;

        Ok(config)
    }
}

impl AvailabilityConfig {
    /// Reject settings that would produce no window or no slots.
    pub fn validate(&self) -> Result<()> {
        if self.window_days == 0 {
            anyhow::bail!("availability.window_days must be at least 1, got 0");
        }
        if self.slot_length_minutes <= 0 {
            anyhow::bail!(
                "availability.slot_length_minutes must be positive, got {}",
                self.slot_length_minutes
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // ==================== Default Value Tests ====================

    #[test]
    fn test_database_config_defaults() {
        let config = DatabaseConfig::default();
        assert_eq!(config.url, "sqlite://appointment-slots.db");
    }

    #[test]
    fn test_availability_config_defaults() {
        let config = AvailabilityConfig::default();
        assert_eq!(config.window_days, 7);
        assert_eq!(config.slot_length_minutes, 30);
    }

    #[test]
    fn test_export_config_defaults() {
        let config = ExportConfig::default();
        assert_eq!(config.output_dir, PathBuf::from("."));
    }

    // ==================== Validation Tests ====================

    #[test]
    fn test_default_availability_config_is_valid() {
        assert!(AvailabilityConfig::default().validate().is_ok());
    }

    #[test]
    fn test_zero_window_is_rejected() {
        let config = AvailabilityConfig {
            window_days: 0,
            ..AvailabilityConfig::default()
        };
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("window_days"), "{err}");
    }

    #[test]
    fn test_non_positive_slot_length_is_rejected() {
        for slot_length_minutes in [0, -30] {
            let config = AvailabilityConfig {
                slot_length_minutes,
                ..AvailabilityConfig::default()
            };
            let err = config.validate().unwrap_err();
            assert!(err.to_string().contains("slot_length_minutes"), "{err}");
        }
    }

    // ==================== Config Loading Tests ====================

    #[test]
    fn test_config_load_with_defaults() {
        let result = AppConfig::load();
        assert!(result.is_ok(), "Config should load: {:?}", result.err());
    }

    #[test]
    fn test_loaded_config_has_expected_structure() {
        let config = AppConfig::load().expect("Config should load");

        assert!(!config.database.url.is_empty());
        assert!(config.availability.window_days > 0);
        assert!(config.availability.slot_length_minutes > 0);
    }

    // ==================== Environment Variable Override Tests ====================

    /// Helper to set and remove an environment variable around `f`.
    fn with_env_var<F, R>(key: &str, value: &str, f: F) -> R
    where
        F: FnOnce() -> R,
    {
        // SAFETY: Test environment, each test uses its own key
        unsafe {
            std::env::set_var(key, value);
        }
        let result = f();
        unsafe {
            std::env::remove_var(key);
        }
        result
    }

    #[test]
    fn test_env_var_overrides_export_dir() {
        let config = with_env_var("SLOTS__EXPORT__OUTPUT_DIR", "/tmp/slots-export", || {
            AppConfig::load().expect("Config should load")
        });

        assert_eq!(config.export.output_dir, PathBuf::from("/tmp/slots-export"));
    }
}
