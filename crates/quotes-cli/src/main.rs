//! Command line driver for the quote aggregator.
//!
//! Credentials and tuning come from the environment (or `.env`); see
//! [`quotes::AggregatorConfig`]. Results are printed as JSON on stdout.

use clap::{Parser, Subcommand};
use quotes::{AggregatorConfig, QuoteAggregator, QuoteSource};
use serde::Serialize;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Debug, Parser)]
#[command(name = "quotes")]
#[command(about = "Real-time quotes with cached multi-provider fallback", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, default_value = "info")]
    log_level: String,

    /// Only query this provider (finnhub, yahoo, fmp, alltick)
    #[arg(long)]
    only: Option<QuoteSource>,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Quote for one ticker
    Quote {
        /// Ticker symbol, e.g. AAPL
        ticker: String,
    },

    /// Quotes for several tickers
    Bulk {
        /// Ticker symbols, comma separated or as separate arguments
        #[arg(required = true, value_delimiter = ',')]
        tickers: Vec<String>,
    },

    /// Symbol search by ticker or company name
    Search {
        /// Search text
        query: String,
    },

    /// Company profile for one or more tickers
    Profile {
        /// Ticker symbols
        #[arg(required = true, value_delimiter = ',')]
        tickers: Vec<String>,
    },

    /// Probe every quote provider
    Status,
}

fn print_json<T: Serialize>(value: &T) -> Result<(), Box<dyn std::error::Error>> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| format!("quotes={}", cli.log_level).into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();

    let mut config = AggregatorConfig::from_env()?;
    if cli.only.is_some() {
        config.only_provider = cli.only;
    }
    tracing::debug!(?config, "Configuration loaded");

    let aggregator = QuoteAggregator::from_config(&config)?;

    match cli.command {
        Commands::Quote { ticker } => match aggregator.get_quote(&ticker).await? {
            Some(quote) => print_json(&quote)?,
            None => {
                tracing::warn!(ticker = %ticker, "Quote not found");
                std::process::exit(1);
            }
        },
        Commands::Bulk { tickers } => {
            print_json(&aggregator.get_bulk_quotes(&tickers).await?)?;
        }
        Commands::Search { query } => {
            print_json(&aggregator.search_symbols(&query).await?)?;
        }
        Commands::Profile { tickers } => {
            if let [ticker] = tickers.as_slice() {
                match aggregator.company_profile(ticker).await? {
                    Some(profile) => print_json(&profile)?,
                    None => {
                        tracing::warn!(ticker = %ticker, "Profile not found");
                        std::process::exit(1);
                    }
                }
            } else {
                print_json(&aggregator.company_profiles(&tickers).await?)?;
            }
        }
        Commands::Status => {
            print_json(&aggregator.probe_providers().await)?;
        }
    }

    Ok(())
}
