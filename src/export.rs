//! Writer for the Inwestomat transactions sheet.

use crate::model::InwestomatTx;
use crate::util::{format_amount, spreadsheet_offset};
use std::io::Write;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExportError {
    #[error("CSV Error")]
    Csv(#[from] csv::Error),

    #[error("I/O error")]
    Io(#[from] std::io::Error),
}

/// Write rows in the layout the Inwestomat sheet pastes from: semicolon
/// delimited, dates in the sheet's timezone, quantities with `,` as the
/// decimal separator. Konto, Nazwa, Klasa aktywów, Klucz, and XIRR are
/// filled in by the sheet itself and stay empty here.
pub fn write_transactions<W: Write>(wtr: W, txs: &[InwestomatTx]) -> Result<(), ExportError> {
    let offset = spreadsheet_offset();
    let mut writer = csv::WriterBuilder::new().delimiter(b';').from_writer(wtr);

    for tx in txs {
        writer.write_record([
            // Konto
            String::new(),
            // Data
            tx.date
                .with_timezone(&offset)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string(),
            // Ticker
            tx.ticker.clone(),
            // Waluta
            tx.currency.code().to_string(),
            // Nazwa
            String::new(),
            // Klasa aktywów
            String::new(),
            // Rodzaj transakcji
            tx.tx_type.as_pl().to_string(),
            // Liczba
            format_amount(tx.amount),
            // Cena
            format_amount(tx.price),
            // Prowizje
            format_amount(tx.fee),
            // Kurs PLN transakcji
            format_amount(tx.pln_rate),
            // Cena nominalna
            format_amount(tx.nominal_price),
            // Total PLN
            format_amount(tx.total_pln),
            // Klucz
            String::new(),
            // XIRR
            String::new(),
            // Komentarz
            tx.comment.clone(),
        ])?;
    }
    writer.flush()?;

    Ok(())
}
