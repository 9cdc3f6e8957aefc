use anyhow::{anyhow, Result};
use chrono::{DateTime, FixedOffset};
use clap::{Parser, Subcommand, ValueEnum};
use rust_decimal::Decimal;
use shared::RecordKind;
use std::path::PathBuf;
use std::str::FromStr;

/// Personal budget dashboard: balance plus daily earnings and spending charts
#[derive(Parser, Debug, Clone)]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// YAML configuration file
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Data directory, overrides the configuration
    #[arg(long, global = true)]
    pub data_dir: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug, Clone)]
pub enum Command {
    /// Render the dashboard once and exit
    Show,
    /// Keep the dashboard live and re-render on every change
    Watch,
    /// Record an earning or a spending
    Add {
        #[arg(long, value_enum)]
        kind: KindArg,
        /// Amount as a plain decimal, e.g. 12.50
        #[arg(long)]
        amount: String,
        /// RFC 3339 timestamp, defaults to now
        #[arg(long)]
        date: Option<String>,
    },
}

#[derive(ValueEnum, Debug, Clone, Copy, PartialEq, Eq)]
pub enum KindArg {
    Income,
    Spending,
}

impl From<KindArg> for RecordKind {
    fn from(kind: KindArg) -> Self {
        match kind {
            KindArg::Income => RecordKind::Income,
            KindArg::Spending => RecordKind::Spending,
        }
    }
}

/// Parse a positive decimal amount from the command line
pub fn parse_amount_arg(raw: &str) -> Result<Decimal> {
    let amount = Decimal::from_str(raw.trim()).map_err(|_| anyhow!("'{}' is not a decimal amount", raw))?;
    if amount <= Decimal::ZERO {
        return Err(anyhow!("amount must be positive, got {}", amount));
    }
    Ok(amount)
}

/// Parse an optional RFC 3339 date argument
pub fn parse_date_arg(raw: Option<&str>) -> Result<Option<DateTime<FixedOffset>>> {
    raw.map(|text| {
        DateTime::parse_from_rfc3339(text).map_err(|e| anyhow!("'{}' is not an RFC 3339 date: {}", text, e))
    })
    .transpose()
}
