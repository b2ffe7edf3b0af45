use thiserror::Error;

/// An asset or instrument symbol.
pub type Ticker = String;

#[derive(Debug, Error)]
#[cfg_attr(test, derive(PartialEq))]
pub enum MarketError {
    #[error("Unknown quote asset in market symbol `{0}`")]
    UnknownQuoteAsset(String),
}

// Quote assets that Binance lists spot markets against. Symbols are matched
// by suffix, longest candidates first where it matters (e.g. TUSD before
// USD would, but USD alone is not a Binance quote asset).
const QUOTE_ASSETS: &[&str] = &[
    "USDT", "BTC", "TRY", "FDUSD", "USDC", "ETH", "BNB", "EUR", "TUSD", "BRL", "JPY", "DAI", "UAH",
    "PLN", "RON", "ZAR", "MXN", "ARS", "XRP", "TRX", "DOGE", "CZK", "IDRT",
];

/// A spot market, split into its base and quote assets.
#[derive(Clone, Debug, Eq, Hash, PartialEq)]
pub struct Market {
    pub base: Ticker,
    pub quote: Ticker,
}

impl Market {
    pub fn new(base: impl Into<Ticker>, quote: impl Into<Ticker>) -> Self {
        Self {
            base: base.into(),
            quote: quote.into(),
        }
    }

    /// Split a concatenated Binance market symbol like `ADABTC` into base
    /// and quote assets by matching the known quote assets.
    pub fn identify(symbol: &str) -> Result<Self, MarketError> {
        for quote in QUOTE_ASSETS {
            if let Some(base) = symbol.strip_suffix(quote) {
                return Ok(Self::new(base, *quote));
            }
        }

        Err(MarketError::UnknownQuoteAsset(symbol.to_string()))
    }

    /// The concatenated symbol used in kline queries.
    pub fn symbol(&self) -> String {
        format!("{}{}", self.base, self.quote)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_identify() {
        assert_eq!(Market::identify("ADABTC").unwrap(), Market::new("ADA", "BTC"));
        assert_eq!(
            Market::identify("BTCUSDT").unwrap(),
            Market::new("BTC", "USDT")
        );
        assert_eq!(Market::identify("ETHPLN").unwrap(), Market::new("ETH", "PLN"));
        assert_eq!(
            Market::identify("BTCFDUSD").unwrap(),
            Market::new("BTC", "FDUSD")
        );
    }

    #[test]
    fn test_identify_unknown_quote() {
        let err = Market::identify("BTCXYZ").unwrap_err();
        assert_eq!(err, MarketError::UnknownQuoteAsset("BTCXYZ".to_string()));
    }

    #[test]
    fn test_symbol_round_trip() {
        let market = Market::identify("DOGEEUR").unwrap();
        assert_eq!(market.symbol(), "DOGEEUR");
    }
}
