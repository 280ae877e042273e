//! Configuration access port.
//!
//! Typed getters return `default` when the key is absent and an error when it
//! is present but malformed.

use crate::domain::error::ConfigError;

pub trait ConfigPort {
    fn get_string(&self, section: &str, key: &str) -> Option<String>;
    fn get_int(&self, section: &str, key: &str, default: i64) -> Result<i64, ConfigError>;
    fn get_double(&self, section: &str, key: &str, default: f64) -> Result<f64, ConfigError>;
    fn get_bool(&self, section: &str, key: &str, default: bool) -> Result<bool, ConfigError>;
}
