use crate::model::{Currency, Market};
use chrono::{DateTime, NaiveDate, Utc};
use rayon::{ThreadPool, ThreadPoolBuilder};
use rust_decimal::Decimal;
use std::{env, sync::Arc};
use thiserror::Error;

pub mod binance;
pub mod nbp;

// Kline lookups are plain REST calls, so the prefetch concurrency is only
// bounded by what the API tolerates. Kept modest to stay under the public
// endpoint's request weight limits.
const DEFAULT_THREADPOOL_SIZE: usize = 8;

pub(crate) type PriceResult = Arc<Result<Decimal, ClientError>>;

#[derive(Debug, Error)]
pub enum PoolError {
    #[error("Error parsing RAYON_NUM_THREADS")]
    RayonThreadPoolSize(#[source] std::num::ParseIntError),

    #[error("Rayon thread pool error")]
    RayonThreadPoolInit(#[from] rayon::ThreadPoolBuildError),
}

#[derive(Clone, Debug, Error)]
pub enum ClientError {
    #[error("Binance kline error")]
    Kline(#[from] binance::KlineError),

    #[error("NBP rate error")]
    Rate(#[from] nbp::RateError),
}

/// Close-price lookup on an exchange spot market.
///
/// Exists as a trait so that unit tests can mock the price source.
pub trait KlineApi {
    /// Get the close price of `market` for the 1-second candle at `time`.
    fn close_price(&self, market: &Market, time: DateTime<Utc>) -> Result<Decimal, ClientError>;
}

/// Average currency exchange rate lookup.
///
/// Exists as a trait so that unit tests can mock the rate source.
pub trait RateApi {
    /// Get the average PLN rate for `currency` in force on `date`.
    fn mid_rate(&self, currency: Currency, date: NaiveDate) -> Result<Decimal, ClientError>;
}

pub(crate) fn create_thread_pool() -> Result<(usize, ThreadPool), PoolError> {
    // Configure the Rayon thread pool for I/O concurrency.
    let num_threads = env::var("RAYON_NUM_THREADS")
        .unwrap_or_else(|_| DEFAULT_THREADPOOL_SIZE.to_string())
        .parse()
        .map_err(PoolError::RayonThreadPoolSize)?;

    let pool = ThreadPoolBuilder::new().num_threads(num_threads).build()?;

    Ok((num_threads, pool))
}
