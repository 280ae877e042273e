//! Instrument universe: symbol lists and exclusion filters.

use std::collections::HashSet;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Instrument {
    pub symbol: String,
    pub name: String,
}

impl Instrument {
    pub fn new(symbol: impl Into<String>, name: impl Into<String>) -> Self {
        Instrument {
            symbol: symbol.into(),
            name: name.into(),
        }
    }

    /// An instrument known only by its symbol.
    pub fn from_symbol(symbol: impl Into<String>) -> Self {
        let symbol = symbol.into();
        Instrument {
            name: symbol.clone(),
            symbol,
        }
    }
}

#[derive(Debug, Clone, thiserror::Error, PartialEq)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),
}

/// Parse a comma-separated symbol list. Symbols are trimmed and upper-cased.
pub fn parse_symbols(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let trimmed = token.trim();
        if trimmed.is_empty() {
            return Err(UniverseError::EmptyToken);
        }
        let symbol = trimmed.to_uppercase();
        if !seen.insert(symbol.clone()) {
            return Err(UniverseError::DuplicateSymbol(symbol));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

/// Drops instruments by symbol prefix or by a term appearing in the name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UniverseFilter {
    pub excluded_symbol_prefixes: Vec<String>,
    pub excluded_name_terms: Vec<String>,
}

impl UniverseFilter {
    /// Main-board A-shares only: no Beijing exchange (`8`), STAR (`688`) or
    /// ChiNext (`300`) listings, no special-treatment or delisting names.
    pub fn a_share_main_board() -> Self {
        UniverseFilter {
            excluded_symbol_prefixes: vec!["8".into(), "688".into(), "300".into()],
            excluded_name_terms: vec!["ST".into(), "退".into(), "风险".into()],
        }
    }

    pub fn excludes(&self, instrument: &Instrument) -> bool {
        self.excluded_symbol_prefixes
            .iter()
            .any(|p| instrument.symbol.starts_with(p.as_str()))
            || self
                .excluded_name_terms
                .iter()
                .any(|t| instrument.name.contains(t.as_str()))
    }

    pub fn apply(&self, instruments: Vec<Instrument>) -> Vec<Instrument> {
        instruments
            .into_iter()
            .filter(|i| !self.excludes(i))
            .collect()
    }
}
