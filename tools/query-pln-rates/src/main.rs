#![forbid(unsafe_code)]

use chrono::NaiveDate;
use error_iter::ErrorIter as _;
use inwestomat_transactions::client::nbp::{NbpClient, DEFAULT_NBP_URL};
use inwestomat_transactions::client::RateApi as _;
use inwestomat_transactions::model::Currency;
use onlyargs::{CliError, OnlyArgs as _};
use onlyargs_derive::OnlyArgs;
use std::{env, process::ExitCode};
use thiserror::Error;

#[derive(Debug, Error)]
enum Error {
    #[error("CLI error")]
    Cli(#[from] CliError),

    #[error("Date parsing error")]
    Date(#[from] chrono::ParseError),

    #[error("Currency error")]
    Currency(#[from] inwestomat_transactions::errors::CurrencyError),

    #[error("Rate lookup error")]
    Rate(#[from] inwestomat_transactions::errors::ClientError),
}

/// Query the NBP table A average rate in force on a date.
#[derive(Debug, OnlyArgs)]
struct Args {
    /// Currency code.
    #[default("USD")]
    currency: String,

    /// Lookup date.
    date: String,
}

fn main() -> ExitCode {
    match run() {
        Ok(_) => ExitCode::SUCCESS,
        Err(err) => {
            if matches!(err, Error::Cli(_)) {
                eprintln!("{}", Args::HELP);
            }

            eprintln!("Error: {err}");
            for source in err.sources().skip(1) {
                eprintln!("  Caused by: {source}");
            }

            ExitCode::FAILURE
        }
    }
}

fn run() -> Result<(), Error> {
    let args: Args = onlyargs::parse()?;

    let currency: Currency = args.currency.parse()?;
    let date: NaiveDate = args.date.parse()?;
    let nbp_url = env::var("NBP_URL").unwrap_or_else(|_| DEFAULT_NBP_URL.to_string());
    let client = NbpClient::new(&nbp_url);
    let rate = client.mid_rate(currency, date)?;

    println!("currency:\t{currency}");
    println!("date:\t{date}");
    println!("rate:\t{rate} PLN");

    Ok(())
}
