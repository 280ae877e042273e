//! CLI definition and dispatch.

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::info;

use crate::adapters::csv_adapter::{parse_date, CsvAdapter};
use crate::adapters::csv_trades_adapter::CsvTradesAdapter;
use crate::adapters::file_config_adapter::FileConfigAdapter;
use crate::adapters::text_report_adapter::{render_text, TextReportAdapter};
use crate::domain::backtest::{run_backtest, BacktestConfig, BacktestReport};
use crate::domain::config_validation::validate_config;
use crate::domain::error::{BacktestError, ConfigError};
use crate::domain::ohlcv::PriceSeries;
use crate::domain::scan::{
    scan_universe, screen_golden_cross, DateRange, ScreenParams, DEFAULT_MIN_BARS,
    DEFAULT_SCREEN_LOOKBACK_DAYS,
};
use crate::domain::universe::{parse_symbols, Instrument, UniverseFilter};
use crate::ports::config_port::ConfigPort;
use crate::ports::data_port::DataPort;
use crate::ports::report_port::ReportPort;

#[derive(Parser, Debug)]
#[command(name = "macross", about = "Moving-average crossover backtester and screener")]
pub struct Cli {
    /// Debug-level logging (overridden by RUST_LOG)
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Backtest the configured symbols one by one
    Backtest {
        #[arg(short, long)]
        config: PathBuf,
        /// Run this symbol instead of the configured list
        #[arg(long)]
        symbol: Option<String>,
        /// Directory for `<symbol>.txt` reports and `<symbol>_trades.csv` exports
        #[arg(short, long)]
        output: Option<PathBuf>,
    },
    /// Backtest a whole universe in parallel and rank the results
    Scan {
        #[arg(short, long)]
        config: PathBuf,
        /// Use every instrument in the data directory, ignoring configured symbols
        #[arg(long)]
        all: bool,
        /// Show only the best N results
        #[arg(long)]
        top: Option<usize>,
    },
    /// List instruments with a golden cross on a given day
    Screen {
        #[arg(short, long)]
        config: PathBuf,
        /// As-of date (YYYY-MM-DD or YYYYMMDD); defaults to [backtest] end_date
        #[arg(long)]
        date: Option<String>,
        #[arg(long, default_value_t = DEFAULT_SCREEN_LOOKBACK_DAYS)]
        lookback_days: i64,
        #[arg(long, default_value_t = DEFAULT_MIN_BARS)]
        min_bars: usize,
    },
    /// Check a configuration file without running anything
    Validate {
        #[arg(short, long)]
        config: PathBuf,
    },
}

/// Everything a command needs from the INI file.
#[derive(Debug, Clone, PartialEq)]
pub struct RunSettings {
    pub backtest: BacktestConfig,
    pub range: DateRange,
    pub data_dir: PathBuf,
    /// Empty means "the whole filtered universe".
    pub symbols: Vec<String>,
    pub universe: UniverseFilter,
}

pub fn run(cli: Cli) -> ExitCode {
    let result = match cli.command {
        Command::Backtest {
            config,
            symbol,
            output,
        } => run_backtests(&config, symbol.as_deref(), output.as_deref()),
        Command::Scan { config, all, top } => run_scan(&config, all, top),
        Command::Screen {
            config,
            date,
            lookback_days,
            min_bars,
        } => run_screen(&config, date.as_deref(), lookback_days, min_bars),
        Command::Validate { config } => run_validate(&config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("error: {e}");
            (&e).into()
        }
    }
}

pub fn load_config(path: &Path) -> Result<FileConfigAdapter, ConfigError> {
    info!(path = %path.display(), "loading config");
    FileConfigAdapter::from_file(path)
}

fn get_usize(
    config: &dyn ConfigPort,
    section: &str,
    key: &str,
    default: usize,
) -> Result<usize, ConfigError> {
    let value = config.get_int(section, key, default as i64)?;
    usize::try_from(value)
        .map_err(|_| ConfigError::invalid(key, format!("{key} must not be negative")))
}

fn get_list(config: &dyn ConfigPort, section: &str, key: &str) -> Vec<String> {
    config
        .get_string(section, key)
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn get_date(config: &dyn ConfigPort, key: &str) -> Result<chrono::NaiveDate, ConfigError> {
    let raw = config
        .get_string("backtest", key)
        .ok_or_else(|| ConfigError::Missing {
            section: "backtest".into(),
            key: key.into(),
        })?;
    parse_date(&raw).ok_or_else(|| {
        ConfigError::invalid(key, "invalid date format (expected YYYY-MM-DD or YYYYMMDD)")
    })
}

/// Map `[backtest]` and `[strategy]` onto a validated `BacktestConfig`.
/// Absent keys take the defaults.
pub fn build_backtest_config(config: &dyn ConfigPort) -> Result<BacktestConfig, ConfigError> {
    let d = BacktestConfig::default();
    let built = BacktestConfig {
        starting_cash: config.get_double("backtest", "starting_cash", d.starting_cash)?,
        commission_rate: config.get_double("backtest", "commission_rate", d.commission_rate)?,
        liquidate_at_end: config.get_bool("backtest", "liquidate_at_end", d.liquidate_at_end)?,
        pfast: get_usize(config, "strategy", "pfast", d.pfast)?,
        pslow: get_usize(config, "strategy", "pslow", d.pslow)?,
        slope_period: get_usize(config, "strategy", "slope_period", d.slope_period)?,
        lookback_period: get_usize(config, "strategy", "lookback_period", d.lookback_period)?,
        stop_loss_pct: config.get_double("strategy", "stop_loss_pct", d.stop_loss_pct)?,
        trail_stop_pct: config.get_double("strategy", "trail_stop_pct", d.trail_stop_pct)?,
        risk_overlay_enabled: config.get_bool("strategy", "risk_overlay", d.risk_overlay_enabled)?,
        breadth_filter_enabled: config.get_bool(
            "strategy",
            "breadth_filter",
            d.breadth_filter_enabled,
        )?,
        breadth_max_lower_days: get_usize(
            config,
            "strategy",
            "breadth_max_lower_days",
            d.breadth_max_lower_days,
        )?,
        position_fraction: config.get_double(
            "strategy",
            "position_fraction",
            d.position_fraction,
        )?,
    };
    validate_config(&built)?;
    Ok(built)
}

pub fn build_universe_filter(config: &dyn ConfigPort) -> Result<UniverseFilter, ConfigError> {
    let mut filter = match config.get_string("universe", "preset").as_deref() {
        None | Some("none") => UniverseFilter::default(),
        Some("a_share") => UniverseFilter::a_share_main_board(),
        Some(other) => {
            return Err(ConfigError::invalid(
                "preset",
                format!("unknown universe preset {other:?}"),
            ));
        }
    };
    filter
        .excluded_symbol_prefixes
        .extend(get_list(config, "universe", "exclude_prefixes"));
    filter
        .excluded_name_terms
        .extend(get_list(config, "universe", "exclude_names"));
    Ok(filter)
}

pub fn build_run_settings(config: &dyn ConfigPort) -> Result<RunSettings, ConfigError> {
    let backtest = build_backtest_config(config)?;
    let range = DateRange::new(get_date(config, "start_date")?, get_date(config, "end_date")?)?;
    let data_dir = config
        .get_string("backtest", "data_dir")
        .map(PathBuf::from)
        .ok_or_else(|| ConfigError::Missing {
            section: "backtest".into(),
            key: "data_dir".into(),
        })?;
    let symbols = match config.get_string("backtest", "symbols") {
        Some(raw) => {
            parse_symbols(&raw).map_err(|e| ConfigError::invalid("symbols", e.to_string()))?
        }
        None => Vec::new(),
    };

    Ok(RunSettings {
        backtest,
        range,
        data_dir,
        symbols,
        universe: build_universe_filter(config)?,
    })
}

fn load_settings(path: &Path) -> Result<RunSettings, ConfigError> {
    let adapter = load_config(path)?;
    build_run_settings(&adapter)
}

/// Configured symbols, or the filtered universe when none are listed.
fn resolve_instruments(
    settings: &RunSettings,
    data_port: &dyn DataPort,
    all: bool,
) -> Result<Vec<Instrument>, BacktestError> {
    if !all && !settings.symbols.is_empty() {
        return Ok(settings
            .symbols
            .iter()
            .map(Instrument::from_symbol)
            .collect());
    }
    let listed = data_port.list_instruments()?;
    let total = listed.len();
    let kept = settings.universe.apply(listed);
    info!(total, kept = kept.len(), "universe filtered");
    Ok(kept)
}

fn backtest_symbol(
    data_port: &dyn DataPort,
    symbol: &str,
    settings: &RunSettings,
) -> Result<BacktestReport, BacktestError> {
    let bars = data_port.fetch_bars(symbol, settings.range.start, settings.range.end)?;
    let series = PriceSeries::new(symbol, bars)?;
    run_backtest(&series, &settings.backtest)
}

fn run_backtests(
    config_path: &Path,
    symbol_override: Option<&str>,
    output_dir: Option<&Path>,
) -> Result<(), BacktestError> {
    let settings = load_settings(config_path)?;
    let symbols = match symbol_override {
        Some(s) => vec![s.trim().to_uppercase()],
        None => settings.symbols.clone(),
    };
    if symbols.is_empty() {
        return Err(ConfigError::Missing {
            section: "backtest".into(),
            key: "symbols".into(),
        }
        .into());
    }

    let data_port = CsvAdapter::new(settings.data_dir.clone());
    for symbol in &symbols {
        let report = backtest_symbol(&data_port, symbol, &settings)?;
        print!("{}", render_text(&report));
        println!();

        if let Some(dir) = output_dir {
            let text_path = dir.join(format!("{symbol}.txt"));
            let trades_path = dir.join(format!("{symbol}_trades.csv"));
            TextReportAdapter::new().write(&report, &text_path.to_string_lossy())?;
            CsvTradesAdapter::new().write(&report, &trades_path.to_string_lossy())?;
            info!(report = %text_path.display(), trades = %trades_path.display(), "report written");
        }
    }
    Ok(())
}

fn opt(value: Option<f64>) -> String {
    value.map_or_else(|| "n/a".to_string(), |v| format!("{v:.2}"))
}

fn run_scan(config_path: &Path, all: bool, top: Option<usize>) -> Result<(), BacktestError> {
    let settings = load_settings(config_path)?;
    let data_port = CsvAdapter::new(settings.data_dir.clone());
    let instruments = resolve_instruments(&settings, &data_port, all)?;

    let summary = scan_universe(&data_port, &instruments, settings.range, &settings.backtest)?;
    let ranked = summary.ranked_by_return();
    let shown = top.unwrap_or(ranked.len()).min(ranked.len());

    println!(
        "{:<10}  {:>9}  {:>8}  {:>6}  {:>8}  {:>8}",
        "symbol", "return %", "max dd %", "trades", "win %", "sharpe"
    );
    for report in &ranked[..shown] {
        let m = &report.metrics;
        println!(
            "{:<10}  {:>9.2}  {:>8.2}  {:>6}  {:>8}  {:>8}",
            report.symbol,
            m.total_return_pct,
            m.max_drawdown_pct,
            m.total_trades,
            opt(m.win_rate.map(|w| w * 100.0)),
            opt(m.sharpe_annualized),
        );
    }

    let failed: Vec<_> = summary.failed().collect();
    if !failed.is_empty() {
        println!();
        println!("Skipped {} of {} instruments:", failed.len(), summary.len());
        for (symbol, reason) in failed {
            println!("  {symbol}: {reason}");
        }
    }
    Ok(())
}

fn run_screen(
    config_path: &Path,
    date: Option<&str>,
    lookback_days: i64,
    min_bars: usize,
) -> Result<(), BacktestError> {
    let settings = load_settings(config_path)?;
    let as_of = match date {
        Some(raw) => parse_date(raw).ok_or_else(|| {
            ConfigError::invalid("date", "invalid date format (expected YYYY-MM-DD or YYYYMMDD)")
        })?,
        None => settings.range.end,
    };

    let data_port = CsvAdapter::new(settings.data_dir.clone());
    let instruments = resolve_instruments(&settings, &data_port, false)?;
    let params = ScreenParams {
        lookback_days,
        pfast: settings.backtest.pfast,
        pslow: settings.backtest.pslow,
        min_bars,
    };

    let hits = screen_golden_cross(&data_port, &instruments, as_of, &params)?;
    println!("Golden crosses on {as_of}: {}", hits.len());
    for hit in &hits {
        println!(
            "  {:<10}  {:<12}  close {:>10.2}  fast {:>10.3}  slow {:>10.3}",
            hit.instrument.symbol, hit.instrument.name, hit.close, hit.fast_ma, hit.slow_ma
        );
    }
    Ok(())
}

fn run_validate(config_path: &Path) -> Result<(), BacktestError> {
    let settings = load_settings(config_path)?;
    let c = &settings.backtest;
    println!("Configuration OK: {}", config_path.display());
    println!("  period:      {} to {}", settings.range.start, settings.range.end);
    println!("  data_dir:    {}", settings.data_dir.display());
    println!(
        "  symbols:     {}",
        if settings.symbols.is_empty() {
            "(universe)".to_string()
        } else {
            settings.symbols.join(",")
        }
    );
    println!("  cash:        {:.2}, commission {}", c.starting_cash, c.commission_rate);
    println!(
        "  averages:    SMA({}) / SMA({}), slope {}, lookback {}",
        c.pfast, c.pslow, c.slope_period, c.lookback_period
    );
    println!(
        "  risk:        {} (stop {}, trail {})",
        if c.risk_overlay_enabled { "on" } else { "off" },
        c.stop_loss_pct,
        c.trail_stop_pct
    );
    println!(
        "  breadth:     {} (max lower days {})",
        if c.breadth_filter_enabled { "on" } else { "off" },
        c.breadth_max_lower_days
    );
    Ok(())
}
