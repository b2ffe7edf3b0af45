use super::{ClientError, PriceResult, RateApi};
use crate::model::Currency;
use crate::util::memo::Memo;
use chrono::{Days, NaiveDate};
use rust_decimal::Decimal;
use serde::Deserialize;
use std::sync::Arc;
use std::time::Instant;
use thiserror::Error;
use tracing::{info, trace};
use ureq::tls::{TlsConfig, TlsProvider};
use ureq::Agent;

pub const DEFAULT_NBP_URL: &str = "https://api.nbp.pl";

#[derive(Clone, Debug, Error)]
pub enum RateError {
    #[error("Error requesting {0} rates: {1}")]
    Http(Currency, String),

    #[error("No {0} rate published before {1}")]
    NoRates(Currency, NaiveDate),
}

/// Cache key for one currency/date average rate lookup.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
struct RateKey {
    currency: Currency,
    date: NaiveDate,
}

type RateFetcher = Box<dyn Fn(&RateKey) -> PriceResult + Send + Sync>;

/// A memoizing client for the National Bank of Poland Web API.
///
/// Rates come from table A (average exchange rates). Each unique
/// (currency, date) is fetched at most once per run; PLN is answered
/// locally with rate 1.
pub struct NbpClient {
    rate_cache: Memo<RateKey, PriceResult, RateFetcher>,
}

impl NbpClient {
    /// Create a new rates client with the provided API server URL.
    pub fn new(api_server: &str) -> Self {
        let agent = Agent::from(
            Agent::config_builder()
                .tls_config(
                    TlsConfig::builder()
                        .provider(TlsProvider::NativeTls)
                        .build(),
                )
                .build(),
        );
        let api_server = api_server.trim_end_matches('/').to_string();

        let fetcher = Box::new(move |key: &RateKey| {
            Arc::new(fetch_rate(&agent, &api_server, key))
        }) as RateFetcher;

        Self {
            rate_cache: Memo::new(fetcher),
        }
    }
}

impl RateApi for NbpClient {
    fn mid_rate(&self, currency: Currency, date: NaiveDate) -> Result<Decimal, ClientError> {
        if currency == Currency::Pln {
            return Ok(Decimal::ONE);
        }

        let key = RateKey { currency, date };

        match self.rate_cache.get(&key).as_ref() {
            Ok(rate) => Ok(*rate),
            Err(err) => Err(err.clone()),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: Vec<Rate>,
}

#[derive(Debug, Deserialize)]
struct Rate {
    #[serde(rename = "effectiveDate")]
    effective_date: String,
    mid: Decimal,
}

/// The published-rate window preceding a transaction date. The API returns
/// one entry per business day; the last entry is the rate in force on
/// `date`. Five days back is enough to cover any run of holidays.
fn rate_window(date: NaiveDate) -> (NaiveDate, NaiveDate) {
    let start = date - Days::new(5);
    let stop = date - Days::new(1);

    (start, stop)
}

fn rate_url(api_server: &str, key: &RateKey) -> String {
    let (start, stop) = rate_window(key.date);

    format!(
        "{api_server}/api/exchangerates/rates/a/{code}/{start}/{stop}/?format=json",
        code = key.currency.code().to_lowercase(),
    )
}

/// The value constructor for the memoizing rates client.
fn fetch_rate(agent: &Agent, api_server: &str, key: &RateKey) -> Result<Decimal, ClientError> {
    info!(
        "Fetching {currency} rates for {date}",
        currency = key.currency,
        date = key.date,
    );

    let start = Instant::now();
    let url = rate_url(api_server, key);
    let mut resp = agent
        .get(&url)
        .call()
        .map_err(|err| RateError::Http(key.currency, err.to_string()))?;
    let rates: RatesResponse = resp
        .body_mut()
        .read_json()
        .map_err(|err| RateError::Http(key.currency, err.to_string()))?;
    let dur = start.elapsed();

    info!(
        "{currency} rates received in {dur:?}",
        currency = key.currency,
    );
    trace!("{rates:#?}");

    let rate = rates
        .rates
        .last()
        .ok_or(RateError::NoRates(key.currency, key.date))?;

    trace!(
        "Using {currency} rate from {effective}",
        currency = key.currency,
        effective = rate.effective_date,
    );

    Ok(rate.mid)
}
