//! Configuration validation.
//!
//! Validates every field before a backtest runs.

use crate::domain::backtest::BacktestConfig;
use crate::domain::error::ConfigError;

pub fn validate_config(config: &BacktestConfig) -> Result<(), ConfigError> {
    validate_starting_cash(config)?;
    validate_commission(config)?;
    validate_periods(config)?;
    validate_fraction("stop_loss_pct", config.stop_loss_pct)?;
    validate_fraction("trail_stop_pct", config.trail_stop_pct)?;
    validate_position_fraction(config)?;
    Ok(())
}

fn validate_starting_cash(config: &BacktestConfig) -> Result<(), ConfigError> {
    if !config.starting_cash.is_finite() || config.starting_cash <= 0.0 {
        return Err(ConfigError::invalid(
            "starting_cash",
            "starting_cash must be positive",
        ));
    }
    Ok(())
}

fn validate_commission(config: &BacktestConfig) -> Result<(), ConfigError> {
    if !config.commission_rate.is_finite() || config.commission_rate < 0.0 {
        return Err(ConfigError::invalid(
            "commission_rate",
            "commission_rate must be non-negative",
        ));
    }
    Ok(())
}

fn validate_periods(config: &BacktestConfig) -> Result<(), ConfigError> {
    let positive = [
        ("pfast", config.pfast),
        ("pslow", config.pslow),
        ("slope_period", config.slope_period),
        ("lookback_period", config.lookback_period),
    ];
    for (key, value) in positive {
        if value == 0 {
            return Err(ConfigError::invalid(key, format!("{key} must be at least 1")));
        }
    }
    if config.pfast >= config.pslow {
        return Err(ConfigError::invalid("pfast", "pfast must be less than pslow"));
    }
    Ok(())
}

fn validate_fraction(key: &str, value: f64) -> Result<(), ConfigError> {
    if !(0.0..=1.0).contains(&value) {
        return Err(ConfigError::invalid(key, format!("{key} must be between 0 and 1")));
    }
    Ok(())
}

fn validate_position_fraction(config: &BacktestConfig) -> Result<(), ConfigError> {
    let value = config.position_fraction;
    if !(value > 0.0 && value <= 1.0) {
        return Err(ConfigError::invalid(
            "position_fraction",
            "position_fraction must be in (0, 1]",
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn invalid_key(config: &BacktestConfig) -> String {
        match validate_config(config) {
            Err(ConfigError::Invalid { key, .. }) => key,
            other => panic!("expected invalid config, got {other:?}"),
        }
    }

    #[test]
    fn default_config_is_valid() {
        assert!(validate_config(&BacktestConfig::default()).is_ok());
    }

    #[test]
    fn rejects_non_positive_cash() {
        let c = BacktestConfig {
            starting_cash: 0.0,
            ..Default::default()
        };
        assert_eq!(invalid_key(&c), "starting_cash");
    }

    #[test]
    fn rejects_negative_commission() {
        let c = BacktestConfig {
            commission_rate: -0.001,
            ..Default::default()
        };
        assert_eq!(invalid_key(&c), "commission_rate");
    }

    #[test]
    fn zero_commission_is_valid() {
        let c = BacktestConfig {
            commission_rate: 0.0,
            ..Default::default()
        };
        assert!(validate_config(&c).is_ok());
    }

    #[test]
    fn rejects_fast_not_below_slow() {
        let c = BacktestConfig {
            pfast: 10,
            pslow: 10,
            ..Default::default()
        };
        assert_eq!(invalid_key(&c), "pfast");
    }

    #[test]
    fn rejects_zero_periods() {
        let c = BacktestConfig {
            slope_period: 0,
            ..Default::default()
        };
        assert_eq!(invalid_key(&c), "slope_period");
        let c = BacktestConfig {
            lookback_period: 0,
            ..Default::default()
        };
        assert_eq!(invalid_key(&c), "lookback_period");
    }

    #[test]
    fn rejects_percentages_outside_unit_interval() {
        let c = BacktestConfig {
            stop_loss_pct: -0.1,
            ..Default::default()
        };
        assert_eq!(invalid_key(&c), "stop_loss_pct");
        let c = BacktestConfig {
            trail_stop_pct: 1.5,
            ..Default::default()
        };
        assert_eq!(invalid_key(&c), "trail_stop_pct");
        let c = BacktestConfig {
            trail_stop_pct: f64::NAN,
            ..Default::default()
        };
        assert_eq!(invalid_key(&c), "trail_stop_pct");
    }

    #[test]
    fn accepts_percentage_bounds() {
        let c = BacktestConfig {
            stop_loss_pct: 0.0,
            trail_stop_pct: 1.0,
            ..Default::default()
        };
        assert!(validate_config(&c).is_ok());
    }

    #[test]
    fn rejects_bad_position_fraction() {
        let c = BacktestConfig {
            position_fraction: 0.0,
            ..Default::default()
        };
        assert_eq!(invalid_key(&c), "position_fraction");
    }
}
