use chrono::FixedOffset;
use rust_decimal::Decimal;

pub(crate) mod memo;

/// The fixed offset used by the Inwestomat spreadsheet and the XTB export
/// (UTC+2). Daylight saving changes are not modeled; the original exports
/// carry this offset year-round.
pub(crate) fn spreadsheet_offset() -> FixedOffset {
    FixedOffset::east_opt(2 * 3600).expect("offset is in range")
}

/// Format a quantity the way the Inwestomat sheet expects: trailing zeros
/// stripped, plain notation, `,` as the decimal separator.
pub(crate) fn format_amount(value: Decimal) -> String {
    value.normalize().to_string().replace('.', ",")
}
