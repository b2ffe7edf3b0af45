//! Reader for the Binance spot trade history XLSX export.

use crate::model::{BinanceTx, Market, Side, Stats};
use calamine::{open_workbook, Data, Reader as _, Xlsx};
use chrono::{DateTime, NaiveDateTime, Utc};
use rust_decimal::Decimal;
use std::path::Path;
use std::str::FromStr as _;
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum BinanceError {
    #[error("XLSX error")]
    Xlsx(#[from] calamine::XlsxError),

    #[error("Workbook has no worksheet")]
    NoWorksheet,

    #[error("Row {0}: expected {1} columns")]
    ShortRow(usize, usize),

    #[error("Row {0}: unable to parse date `{1}`")]
    Date(usize, String),

    #[error("Row {0}: {1}")]
    Market(usize, #[source] crate::errors::MarketError),

    #[error("Row {0}: unknown trade side `{1}`")]
    Side(usize, String),

    #[error("Row {0}: unable to parse number `{1}`")]
    Number(usize, String),

    #[error("Row {0}: expected a text cell")]
    Text(usize),
}

// The export's fixed column layout.
const COL_DATE: usize = 0;
const COL_MARKET: usize = 1;
const COL_TYPE: usize = 2;
const COL_PRICE: usize = 3;
const COL_AMOUNT: usize = 4;
const COL_TOTAL: usize = 5;
const COL_FEE: usize = 6;
const COL_FEE_COIN: usize = 7;
const COLUMNS: usize = 8;

/// Read a Binance trade history XLSX.
///
/// The first row is the header; reading stops at the first incomplete row,
/// which is how the export marks the end of the table.
pub fn read_trades(s: &mut Stats, path: impl AsRef<Path>) -> Result<Vec<BinanceTx>, BinanceError> {
    let mut workbook: Xlsx<_> = open_workbook(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or(BinanceError::NoWorksheet)??;

    let mut rows = Vec::new();

    debug!("Parsing Binance trade rows");
    for (index, row) in range.rows().enumerate().skip(1) {
        if row.len() < COLUMNS || row.iter().take(COLUMNS).any(|cell| cell == &Data::Empty) {
            break;
        }

        let record = parse_row(index, row)?;
        debug!("Parsed: {record:?}");

        rows.push(record);
        s.inc_binance();
    }

    Ok(rows)
}

fn parse_row(index: usize, row: &[Data]) -> Result<BinanceTx, BinanceError> {
    if row.len() < COLUMNS {
        return Err(BinanceError::ShortRow(index, COLUMNS));
    }

    let market = text_cell(index, &row[COL_MARKET])?;
    let side = text_cell(index, &row[COL_TYPE])?;
    let side = match side.as_str() {
        "BUY" => Side::Buy,
        "SELL" => Side::Sell,
        unknown => return Err(BinanceError::Side(index, unknown.to_string())),
    };

    Ok(BinanceTx {
        date: date_cell(index, &row[COL_DATE])?,
        market: Market::identify(&market).map_err(|err| BinanceError::Market(index, err))?,
        side,
        price: decimal_cell(index, &row[COL_PRICE])?,
        amount: decimal_cell(index, &row[COL_AMOUNT])?,
        total: decimal_cell(index, &row[COL_TOTAL])?,
        fee: decimal_cell(index, &row[COL_FEE])?,
        fee_coin: text_cell(index, &row[COL_FEE_COIN])?,
    })
}

/// Parse a date cell. The export stores `Date(UTC)` as ISO text, but a
/// sheet that went through a spreadsheet editor may hold native datetime
/// cells instead.
fn date_cell(index: usize, cell: &Data) -> Result<DateTime<Utc>, BinanceError> {
    let naive = match cell {
        Data::String(text) => NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
            .map_err(|_| BinanceError::Date(index, text.clone()))?,
        Data::DateTime(dt) => dt
            .as_datetime()
            .ok_or_else(|| BinanceError::Date(index, format!("{dt:?}")))?,
        other => return Err(BinanceError::Date(index, format!("{other:?}"))),
    };

    Ok(naive.and_utc())
}

/// Parse a numeric cell. Text cells keep full precision; float cells are
/// converted as written.
fn decimal_cell(index: usize, cell: &Data) -> Result<Decimal, BinanceError> {
    match cell {
        Data::String(text) => {
            Decimal::from_str(text).map_err(|_| BinanceError::Number(index, text.clone()))
        }
        Data::Float(value) => Decimal::from_f64_retain(*value)
            .ok_or_else(|| BinanceError::Number(index, value.to_string())),
        Data::Int(value) => Ok(Decimal::from(*value)),
        other => Err(BinanceError::Number(index, format!("{other:?}"))),
    }
}

fn text_cell(index: usize, cell: &Data) -> Result<String, BinanceError> {
    match cell {
        Data::String(text) => Ok(text.clone()),
        _ => Err(BinanceError::Text(index)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    #[test]
    fn test_parse_row() {
        let row = [
            Data::String("2024-05-05 00:34:09".to_string()),
            Data::String("ADABTC".to_string()),
            Data::String("BUY".to_string()),
            Data::String("0.0000072".to_string()),
            Data::String("24".to_string()),
            Data::String("0.0001728".to_string()),
            Data::String("0.024".to_string()),
            Data::String("ADA".to_string()),
        ];

        let expected = BinanceTx {
            date: "2024-05-05 00:34:09+0000".parse().unwrap(),
            market: Market::new("ADA", "BTC"),
            side: Side::Buy,
            price: dec("0.0000072"),
            amount: dec("24"),
            total: dec("0.0001728"),
            fee: dec("0.024"),
            fee_coin: "ADA".to_string(),
        };
        assert_eq!(parse_row(1, &row).unwrap(), expected);
    }

    #[test]
    fn test_parse_row_with_numeric_cells() {
        let row = [
            Data::String("2024-05-01 10:17:28".to_string()),
            Data::String("BTCUSDT".to_string()),
            Data::String("SELL".to_string()),
            Data::Float(63000.5),
            Data::Float(0.5),
            Data::Float(31500.25),
            Data::Int(0),
            Data::String("USDT".to_string()),
        ];

        let record = parse_row(2, &row).unwrap();

        assert_eq!(record.side, Side::Sell);
        assert_eq!(record.price, dec("63000.5"));
        assert_eq!(record.amount, dec("0.5"));
        assert_eq!(record.total, dec("31500.25"));
        assert_eq!(record.fee, Decimal::ZERO);
    }

    #[test]
    fn test_parse_row_rejects_unknown_side() {
        let row = [
            Data::String("2024-05-05 00:34:09".to_string()),
            Data::String("ADABTC".to_string()),
            Data::String("CONVERT".to_string()),
            Data::String("0.0000072".to_string()),
            Data::String("24".to_string()),
            Data::String("0.0001728".to_string()),
            Data::String("0.024".to_string()),
            Data::String("ADA".to_string()),
        ];

        assert!(matches!(
            parse_row(3, &row),
            Err(BinanceError::Side(3, side)) if side == "CONVERT",
        ));
    }

    #[test]
    fn test_parse_row_rejects_unknown_market() {
        let row = [
            Data::String("2024-05-05 00:34:09".to_string()),
            Data::String("BTCXYZ".to_string()),
            Data::String("BUY".to_string()),
            Data::String("1".to_string()),
            Data::String("1".to_string()),
            Data::String("1".to_string()),
            Data::String("0".to_string()),
            Data::String("BTC".to_string()),
        ];

        assert!(matches!(parse_row(4, &row), Err(BinanceError::Market(4, _))));
    }
}
