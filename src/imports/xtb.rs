//! Reader for the XTB cash operations CSV export.

use crate::model::{
    CashFlow, Side, Stats, XtbBuySell, XtbCosts, XtbDepositWithdraw, XtbDividendInterest, XtbTx,
};
use crate::util::spreadsheet_offset;
use chrono::{DateTime, NaiveDateTime, Utc};
use regex::Regex;
use rust_decimal::Decimal;
use serde::Deserialize;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::str::FromStr as _;
use std::sync::LazyLock;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum XtbError {
    #[error("CSV Error")]
    Csv(#[from] csv::Error),

    #[error("FS Error")]
    Fs(#[from] std::io::Error),

    #[error("DateTime parsing error")]
    DateTime(#[from] chrono::ParseError),

    #[error("Unable to parse amount `{0}`")]
    Amount(String),

    #[error("Unrecognized order comment `{0}`")]
    Comment(String),

    #[error("Unknown operation type: {0}")]
    UnknownOperation(String),
}

// Order comments look like `OPEN BUY 10/25 @ 100.00`: filled units, the
// ordered total (optional), and the unit price. The verb is `BUY` for both
// sides; the cash amount's sign tells buys and sells apart.
static BUY_SELL_COMMENT: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?x)
        ^(?:OPEN|CLOSE)\ BUY\           # prefix
        (?P<asset_amount>\d+(?:\.\d+)?) # units filled
        (?:/(?:\d+(?:\.\d+)?))?         # units ordered
        \ @\                            # separator
        (?P<price>\d+(?:\.\d+)?)$       # unit price
        ",
    )
    .expect("regex is valid")
});

#[derive(Clone, Debug, Deserialize)]
struct XtbCsvRow {
    #[serde(rename = "ID")]
    id: String,

    #[serde(rename = "Type")]
    op_type: String,

    #[serde(rename = "Time")]
    time: String,

    #[serde(rename = "Symbol")]
    symbol: String,

    #[serde(rename = "Comment")]
    comment: String,

    #[serde(rename = "Amount")]
    amount: String,
}

/// Read an XTB cash operations CSV from a file.
pub fn read_cash_operations(
    s: &mut Stats,
    path: impl AsRef<Path>,
) -> Result<Vec<XtbTx>, XtbError> {
    let file = File::open(path)?;

    read_cash_operations_from(s, file)
}

/// Read an XTB cash operations CSV from any reader.
pub fn read_cash_operations_from(
    s: &mut Stats,
    rdr: impl Read,
) -> Result<Vec<XtbTx>, XtbError> {
    let mut reader = csv::ReaderBuilder::new().delimiter(b';').from_reader(rdr);
    let mut rows = Vec::new();

    debug!("Parsing XTB cash operation rows");
    for result in reader.deserialize() {
        let record: XtbCsvRow = result?;
        debug!("Deserialized: {record:?}");

        let record2 = parse_row(record)?;
        debug!("Parsed: {record2:?}");

        rows.push(record2);
        s.inc_xtb();
    }

    Ok(rows)
}

fn parse_row(row: XtbCsvRow) -> Result<XtbTx, XtbError> {
    let time = parse_time(&row.time)?;
    let currency_amount =
        Decimal::from_str(&row.amount).map_err(|_| XtbError::Amount(row.amount.clone()))?;

    match row.op_type.as_str() {
        "Sprzedaż akcji/ETF" | "Zakup akcji/ETF" => {
            let captures = BUY_SELL_COMMENT
                .captures(&row.comment)
                .ok_or_else(|| XtbError::Comment(row.comment.clone()))?;
            let asset_amount = Decimal::from_str(&captures["asset_amount"])
                .map_err(|_| XtbError::Comment(row.comment.clone()))?;
            let price = Decimal::from_str(&captures["price"])
                .map_err(|_| XtbError::Comment(row.comment.clone()))?;
            let side = if currency_amount < Decimal::ZERO {
                Side::Buy
            } else {
                Side::Sell
            };

            Ok(XtbTx::BuySell(XtbBuySell {
                id: row.id,
                side,
                time,
                symbol: row.symbol,
                asset_amount,
                price,
                currency_amount,
            }))
        }

        "Wpłata" | "Wypłata" => {
            let flow = if currency_amount < Decimal::ZERO {
                CashFlow::Withdraw
            } else {
                CashFlow::Deposit
            };

            Ok(XtbTx::DepositWithdraw(XtbDepositWithdraw {
                id: row.id,
                flow,
                time,
                currency_amount,
            }))
        }

        "Dywidenda" | "Odsetki od wolnych środków" => {
            Ok(XtbTx::DividendInterest(XtbDividendInterest {
                id: row.id,
                time,
                symbol: row.symbol,
                currency_amount,
            }))
        }

        "Podatek od dywidend" | "Podatek od odsetek od wolnych środków" => {
            Ok(XtbTx::Costs(XtbCosts {
                id: row.id,
                time,
                symbol: row.symbol,
                currency_amount,
            }))
        }

        unknown => Err(XtbError::UnknownOperation(unknown.to_string())),
    }
}

/// Export times are local to the sheet's fixed UTC+2 offset.
fn parse_time(time: &str) -> Result<DateTime<Utc>, XtbError> {
    let naive = NaiveDateTime::parse_from_str(time, "%d.%m.%Y %H:%M:%S")?;
    let local = naive
        .and_local_timezone(spreadsheet_offset())
        .unwrap();

    Ok(local.with_timezone(&Utc))
}
