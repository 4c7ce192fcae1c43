//! Watch-list configuration: which stocks to forecast, over what history and
//! for which horizons.

use super::parse_env;
use crate::domain::horizon::Horizon;
use anyhow::{Context, Result, bail};
use std::env;

/// Default FTSE MIB watch-list with display names.
pub const DEFAULT_STOCKS: &[(&str, &str)] = &[
    ("ENI.MI", "Eni S.p.A."),
    ("ISP.MI", "Intesa Sanpaolo S.p.A."),
    ("UCG.MI", "UniCredit S.p.A."),
    ("ENEL.MI", "Enel S.p.A."),
    ("A2A.MI", "A2A S.p.A."),
    ("TIT.MI", "TIM S.p.A. (Telecom Italia)"),
    ("G.MI", "Assicurazioni Generali S.p.A."),
    ("RACE.MI", "Ferrari N.V."),
    ("BAMI.MI", "Banco BPM S.p.A."),
    ("TEN.MI", "Tenaris S.A."),
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Stock {
    pub symbol: String,
    pub name: String,
}

impl Stock {
    /// Known symbols get their display name; others are named after themselves.
    pub fn from_symbol(symbol: &str) -> Self {
        let name = DEFAULT_STOCKS
            .iter()
            .find(|(s, _)| *s == symbol)
            .map(|(_, n)| n.to_string())
            .unwrap_or_else(|| symbol.to_string());
        Self {
            symbol: symbol.to_string(),
            name,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct WatchlistEnvConfig {
    pub stocks: Vec<Stock>,
    pub history_days: u32,
    pub horizons: Vec<Horizon>,
}

impl WatchlistEnvConfig {
    pub fn from_env() -> Result<Self> {
        let stocks = match env::var("SYMBOLS") {
            Ok(raw) => Self::parse_symbols(&raw),
            Err(_) => DEFAULT_STOCKS
                .iter()
                .map(|(s, _)| Stock::from_symbol(s))
                .collect(),
        };
        if stocks.is_empty() {
            bail!("SYMBOLS must name at least one stock");
        }

        let horizons = match env::var("HORIZONS") {
            Ok(raw) => Self::parse_horizons(&raw)?,
            Err(_) => Horizon::defaults(),
        };

        Ok(Self {
            stocks,
            history_days: parse_env("HISTORY_DAYS", 730)?,
            horizons,
        })
    }

    pub fn parse_symbols(raw: &str) -> Vec<Stock> {
        raw.split(',')
            .map(|s| s.trim().to_uppercase())
            .filter(|s| !s.is_empty())
            .map(|s| Stock::from_symbol(&s))
            .collect()
    }

    pub fn parse_horizons(raw: &str) -> Result<Vec<Horizon>> {
        let horizons = raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<Horizon>().context("Failed to parse HORIZONS"))
            .collect::<Result<Vec<_>>>()?;
        if horizons.is_empty() {
            bail!("HORIZONS must list at least one horizon");
        }
        Ok(horizons)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_symbols_uses_known_names() {
        let stocks = WatchlistEnvConfig::parse_symbols(" eni.mi, RACE.MI ,,XYZ.MI");
        assert_eq!(stocks.len(), 3);
        assert_eq!(stocks[0].name, "Eni S.p.A.");
        assert_eq!(stocks[1].name, "Ferrari N.V.");
        assert_eq!(stocks[2].name, "XYZ.MI");
    }

    #[test]
    fn test_parse_horizons() {
        assert_eq!(
            WatchlistEnvConfig::parse_horizons("2h, 1d,7d").unwrap(),
            vec![Horizon::Hours(2), Horizon::Days(1), Horizon::Days(7)]
        );
        assert!(WatchlistEnvConfig::parse_horizons("1d,2w").is_err());
        assert!(WatchlistEnvConfig::parse_horizons(" , ").is_err());
    }
}
