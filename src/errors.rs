//! Re-exports for all error types in the crate.

pub use crate::client::binance::{BinanceClientError, KlineError};
pub use crate::client::nbp::RateError;
pub use crate::client::{ClientError, PoolError};
pub use crate::export::ExportError;
pub use crate::imports::binance::BinanceError;
pub use crate::imports::xtb::XtbError;
pub use crate::model::convert::ConvertError;
pub use crate::model::currency::CurrencyError;
pub use crate::model::market::MarketError;
