use super::{ClientError, KlineApi, PoolError, PriceResult};
use crate::model::Market;
use crate::util::memo::Memo;
use chrono::{DateTime, Utc};
use rayon::{prelude::*, ThreadPool};
use rust_decimal::Decimal;
use serde_json::Value;
use std::str::FromStr as _;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{info, trace};
use ureq::tls::{TlsConfig, TlsProvider};
use ureq::Agent;

pub const DEFAULT_BINANCE_URL: &str = "https://api.binance.com";

// Index of the close price in a kline payload. The full layout is:
// open time, open, high, low, close, volume, close time, quote volume,
// trade count, taker buy base volume, taker buy quote volume, ignore.
const KLINE_CLOSE: usize = 4;

#[derive(Debug, Error)]
pub enum BinanceClientError {
    #[error("Thread Pool error")]
    ThreadPool(#[from] PoolError),
}

#[derive(Clone, Debug, Error)]
pub enum KlineError {
    #[error("Error requesting klines for `{0}`: {1}")]
    Http(String, String),

    #[error("No kline returned for `{0}`")]
    NoData(String),

    #[error("Unable to parse close price for `{0}`: {1}")]
    Price(String, String),
}

/// Cache key for a single 1-second candle lookup.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct KlineKey {
    symbol: String,
    start_ms: i64,
}

impl KlineKey {
    pub fn new(market: &Market, time: DateTime<Utc>) -> Self {
        Self {
            symbol: market.symbol(),
            start_ms: time.timestamp_millis(),
        }
    }
}

type KlineFetcher = Box<dyn Fn(&KlineKey) -> PriceResult + Send + Sync>;

/// A memoizing client for the Binance public klines endpoint.
///
/// Each unique (market, second) is fetched at most once per run. Lookups
/// fan out on a rayon pool via [`BinanceClient::prefetch`]; see
/// `cargo run -- --help` for the pool size override.
pub struct BinanceClient {
    pool: ThreadPool,
    price_cache: Memo<KlineKey, PriceResult, KlineFetcher>,
}

impl BinanceClient {
    /// Create a new klines client with the provided API server URL.
    pub fn new(api_server: &str) -> Result<Self, BinanceClientError> {
        let (num_threads, pool) = super::create_thread_pool()?;

        let agent = Agent::from(
            Agent::config_builder()
                .max_idle_connections_per_host(num_threads)
                .tls_config(
                    TlsConfig::builder()
                        .provider(TlsProvider::NativeTls)
                        .build(),
                )
                .build(),
        );
        let api_server = api_server.trim_end_matches('/').to_string();

        let fetcher = Box::new(move |key: &KlineKey| {
            Arc::new(fetch_close(&agent, &api_server, key))
        }) as KlineFetcher;

        Ok(Self {
            pool,
            price_cache: Memo::new(fetcher),
        })
    }

    /// Warm the price cache for the given keys concurrently.
    pub fn prefetch(&self, keys: &[KlineKey]) {
        self.pool.in_place_scope(|_scope| {
            keys.par_iter().for_each(|key| {
                let _ = self.price_cache.get(key);
            });
        });
    }
}

impl KlineApi for BinanceClient {
    fn close_price(&self, market: &Market, time: DateTime<Utc>) -> Result<Decimal, ClientError> {
        let key = KlineKey::new(market, time);

        match self.price_cache.get(&key).as_ref() {
            Ok(price) => Ok(*price),
            Err(err) => Err(err.clone()),
        }
    }
}

fn kline_url(api_server: &str, key: &KlineKey) -> String {
    format!(
        "{api_server}/api/v3/klines?symbol={symbol}&interval=1s\
&startTime={from}&endTime={to}&limit=1",
        symbol = key.symbol,
        from = key.start_ms,
        to = key.start_ms + 1,
    )
}

/// The value constructor for the memoizing klines client.
fn fetch_close(agent: &Agent, api_server: &str, key: &KlineKey) -> Result<Decimal, ClientError> {
    let thread_id = std::thread::current().id();

    info!(
        "Fetching `{symbol}` kline at {start} on {thread_id:?}",
        symbol = key.symbol,
        start = key.start_ms,
    );

    let start = Instant::now();
    let url = kline_url(api_server, key);
    let mut resp = agent
        .get(&url)
        .call()
        .map_err(|err| KlineError::Http(key.symbol.clone(), err.to_string()))?;
    let klines: Vec<Vec<Value>> = resp
        .body_mut()
        .read_json()
        .map_err(|err| KlineError::Http(key.symbol.clone(), err.to_string()))?;
    let dur = start.elapsed();

    info!("`{symbol}` kline received in {dur:?}", symbol = key.symbol);
    trace!("{klines:#?}");

    let close = klines
        .first()
        .and_then(|kline| kline.get(KLINE_CLOSE))
        .and_then(Value::as_str)
        .ok_or_else(|| KlineError::NoData(key.symbol.clone()))?;

    Ok(Decimal::from_str(close)
        .map_err(|err| KlineError::Price(key.symbol.clone(), err.to_string()))?)
}
