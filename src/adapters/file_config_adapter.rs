//! INI file configuration adapter.

use crate::domain::error::ConfigError;
use crate::ports::config_port::ConfigPort;
use configparser::ini::Ini;
use std::path::Path;

#[derive(Debug)]
pub struct FileConfigAdapter {
    config: Ini,
}

impl FileConfigAdapter {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let mut config = Ini::new();
        config.load(path).map_err(|reason| ConfigError::Parse {
            file: path.display().to_string(),
            reason,
        })?;
        Ok(Self { config })
    }

    pub fn from_string(content: &str) -> Result<Self, ConfigError> {
        let mut config = Ini::new();
        config
            .read(content.to_string())
            .map_err(|reason| ConfigError::Parse {
                file: "<string>".to_string(),
                reason,
            })?;
        Ok(Self { config })
    }

    fn parse_bool(value: &str) -> Option<bool> {
        match value.trim().to_lowercase().as_str() {
            "true" | "yes" | "on" | "1" => Some(true),
            "false" | "no" | "off" | "0" => Some(false),
            _ => None,
        }
    }
}

fn qualified(section: &str, key: &str) -> String {
    format!("{section}.{key}")
}

impl ConfigPort for FileConfigAdapter {
    fn get_string(&self, section: &str, key: &str) -> Option<String> {
        self.config.get(section, key)
    }

    fn get_int(&self, section: &str, key: &str, default: i64) -> Result<i64, ConfigError> {
        self.config
            .getint(section, key)
            .map(|v| v.unwrap_or(default))
            .map_err(|reason| ConfigError::invalid(&qualified(section, key), reason))
    }

    fn get_double(&self, section: &str, key: &str, default: f64) -> Result<f64, ConfigError> {
        self.config
            .getfloat(section, key)
            .map(|v| v.unwrap_or(default))
            .map_err(|reason| ConfigError::invalid(&qualified(section, key), reason))
    }

    fn get_bool(&self, section: &str, key: &str, default: bool) -> Result<bool, ConfigError> {
        match self.config.get(section, key) {
            None => Ok(default),
            Some(v) => Self::parse_bool(&v).ok_or_else(|| {
                ConfigError::invalid(
                    &qualified(section, key),
                    format!("expected a boolean, got {v:?}"),
                )
            }),
        }
    }
}
