#![forbid(unsafe_code)]

use error_iter::ErrorIter as _;
use inwestomat_transactions::client::binance::{BinanceClient, KlineKey, DEFAULT_BINANCE_URL};
use inwestomat_transactions::client::nbp::{NbpClient, DEFAULT_NBP_URL};
use inwestomat_transactions::export::write_transactions;
use inwestomat_transactions::imports::binance::read_trades;
use inwestomat_transactions::imports::xtb::read_cash_operations;
use inwestomat_transactions::model::{
    convert_binance_tx, convert_xtb_txs, pln_pricing_market, Currency, InwestomatTx, Stats,
};
use is_terminal::IsTerminal as _;
use onlyargs::CliError;
use onlyargs_derive::OnlyArgs;
use std::collections::HashSet;
use std::fs::File;
use std::io::BufWriter;
use std::path::PathBuf;
use std::{env, process::ExitCode};
use thiserror::Error;
use tracing::debug;
use tracing_subscriber::filter::{EnvFilter, LevelFilter};
use tracing_subscriber::prelude::*;

#[derive(Debug, OnlyArgs)]
#[footer = "Additional environment variables:"]
#[footer = "  - BINANCE_URL accepts a http: or https: URL"]
#[footer = "      default is \"https://api.binance.com\""]
#[footer = "  - NBP_URL accepts a http: or https: URL"]
#[footer = "      default is \"https://api.nbp.pl\""]
#[footer = "  - RAYON_NUM_THREADS sets the connection concurrency for kline lookups"]
#[footer = "      default is 8"]
#[footer = "  - TERM_COLOR accepts \"always\" to override automatic terminal sensing"]
struct Args {
    /// Read Binance trade history XLSX from a file.
    #[long]
    input_binance: Vec<PathBuf>,

    /// Read XTB cash operations CSV from a file.
    #[long]
    input_xtb: Vec<PathBuf>,

    /// Currency the XTB account is denominated in.
    ///   Ignored for Binance inputs, which are priced through PLN markets
    ///   directly.
    #[short('c')]
    #[default("PLN")]
    currency: String,

    /// Write the Inwestomat CSV to this path instead of stdout.
    #[short('o')]
    output: Option<PathBuf>,
}

#[derive(Debug, Error)]
enum Error {
    #[error("Argument parsing error")]
    Args(#[from] CliError),

    #[error("Currency parsing error")]
    Currency(#[from] inwestomat_transactions::errors::CurrencyError),

    #[error("Failed to import {0:?}")]
    ImportBinance(
        PathBuf,
        #[source] inwestomat_transactions::errors::BinanceError,
    ),

    #[error("Failed to import {0:?}")]
    ImportXtb(PathBuf, #[source] inwestomat_transactions::errors::XtbError),

    #[error("Binance client error")]
    BinanceClient(#[from] inwestomat_transactions::errors::BinanceClientError),

    #[error("Conversion error")]
    Convert(#[from] inwestomat_transactions::errors::ConvertError),

    #[error("Unable to write output")]
    Export(#[from] inwestomat_transactions::errors::ExportError),

    #[error("I/O error")]
    Io(#[from] std::io::Error),
}

fn main() -> ExitCode {
    // Initialize the tracing subscriber for instrumentation.
    // Uses the `RUST_LOG` environment var for configuration. E.g. `RUST_LOG=debug cargo run`
    // This is very useful to see the input row that caused a panic.
    //
    // See: https://docs.rs/tracing-subscriber/latest/tracing_subscriber/struct.EnvFilter.html#directives
    let env_filter = EnvFilter::builder()
        .with_default_directive(LevelFilter::INFO.into())
        .from_env_lossy();
    let term_color = env::var("TERM_COLOR")
        .map(|color| color == "always")
        .unwrap_or_else(|_| std::io::stderr().is_terminal());
    tracing_subscriber::registry()
        .with(
            // Logs go to stderr; stdout carries the converted CSV.
            tracing_subscriber::fmt::layer()
                .with_ansi(term_color)
                .with_writer(std::io::stderr),
        )
        .with(env_filter)
        .init();

    match run(onlyargs::parse()) {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("Error: {err}");
            for source in err.sources().skip(1) {
                eprintln!("  Caused by: {source}");
            }

            ExitCode::FAILURE
        }
    }
}

fn run(args: Result<Args, CliError>) -> Result<(), Error> {
    let args = args?;

    let currency: Currency = args.currency.parse()?;

    let mut stats = Stats::default();

    let mut binance_txs = Vec::new();
    for path in args.input_binance {
        binance_txs
            .extend(read_trades(&mut stats, &path).map_err(|e| Error::ImportBinance(path, e))?);
    }

    let mut xtb_txs = Vec::new();
    for path in args.input_xtb {
        xtb_txs.extend(
            read_cash_operations(&mut stats, &path).map_err(|e| Error::ImportXtb(path, e))?,
        );
    }

    let mut rows: Vec<InwestomatTx> = Vec::new();

    if !binance_txs.is_empty() {
        let binance_url =
            env::var("BINANCE_URL").unwrap_or_else(|_| DEFAULT_BINANCE_URL.to_string());
        let client = BinanceClient::new(&binance_url)?;

        // Fetch each unique quote-asset candle once, concurrently.
        let keys: HashSet<_> = binance_txs
            .iter()
            .filter_map(|tx| {
                pln_pricing_market(&tx.market).map(|market| KlineKey::new(&market, tx.date))
            })
            .collect();
        let keys = Vec::from_iter(keys);
        debug!("Prefetching {} unique klines", keys.len());
        client.prefetch(&keys);

        for tx in &binance_txs {
            rows.extend(convert_binance_tx(&client, tx)?);
        }
    }

    if !xtb_txs.is_empty() {
        let nbp_url = env::var("NBP_URL").unwrap_or_else(|_| DEFAULT_NBP_URL.to_string());
        let client = NbpClient::new(&nbp_url);

        rows.extend(convert_xtb_txs(&client, &xtb_txs, currency)?);
    }

    stats.add_output(rows.len());

    if let Some(path) = args.output.as_ref() {
        let file = BufWriter::new(File::create(path)?);
        write_transactions(file, &rows)?;

        println!("Inwestomat CSV written to {}", path.display());
    } else {
        let stdout = std::io::stdout().lock();
        write_transactions(stdout, &rows)?;
    }

    stats.pretty_print();

    Ok(())
}
