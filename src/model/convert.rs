//! Translation of exchange rows into Inwestomat rows.

use crate::client::{ClientError, KlineApi, RateApi};
use crate::model::{
    BinanceTx, CashFlow, Currency, InwestomatTx, Market, Side, Ticker, TxType, XtbTx,
};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConvertError {
    #[error("Price lookup failed")]
    Client(#[from] ClientError),

    #[error("Ticker `{0}` is missing a country suffix")]
    MissingCountry(String),

    #[error("Unknown country `{1}` in ticker `{0}`")]
    UnknownCountry(String, String),
}

/// PLN close prices for both assets of a market at a point in time.
#[derive(Clone, Debug, PartialEq)]
pub struct PlnPrices {
    pub base: Decimal,
    pub quote: Decimal,
}

/// The market used to price a trade's quote asset in PLN, or `None` when
/// the trade is already quoted in PLN.
pub fn pln_pricing_market(market: &Market) -> Option<Market> {
    (market.quote != "PLN").then(|| Market::new(market.quote.clone(), "PLN"))
}

/// Price both assets of `market` in PLN at `time`.
///
/// Only the quote asset needs a lookup; the base asset's PLN price follows
/// from the trade price.
pub fn find_pln_prices(
    client: &impl KlineApi,
    market: &Market,
    price: Decimal,
    time: DateTime<Utc>,
) -> Result<PlnPrices, ClientError> {
    let quote = match pln_pricing_market(market) {
        Some(pricing_market) => client.close_price(&pricing_market, time)?,
        None => Decimal::ONE,
    };

    Ok(PlnPrices {
        base: price * quote,
        quote,
    })
}

/// Convert one Binance trade, pricing it through `client`.
pub fn convert_binance_tx(
    client: &impl KlineApi,
    btx: &BinanceTx,
) -> Result<Vec<InwestomatTx>, ConvertError> {
    let prices = find_pln_prices(client, &btx.market, btx.price, btx.date)?;

    Ok(split_binance_tx(btx, &prices).to_vec())
}

/// Split one Binance trade into its two Inwestomat rows: a SELL of the
/// asset paid and a BUY of the asset received, both denominated in PLN.
pub fn split_binance_tx(btx: &BinanceTx, prices: &PlnPrices) -> [InwestomatTx; 2] {
    let (sell_ticker, sell_price, buy_ticker, buy_price) = match btx.side {
        Side::Buy => (&btx.market.quote, prices.quote, &btx.market.base, prices.base),
        Side::Sell => (&btx.market.base, prices.base, &btx.market.quote, prices.quote),
    };
    let (sell_amount, mut buy_amount) = match btx.side {
        Side::Buy => (btx.total, btx.amount),
        Side::Sell => (btx.amount, btx.total),
    };

    // Totals are figured before the fee is taken out of the received amount.
    let sell_total_pln = sell_amount * sell_price;
    let buy_total_pln = buy_amount * buy_price;

    let sell_fee = Decimal::ZERO;
    let mut buy_fee = Decimal::ZERO;
    if btx.fee_coin == *buy_ticker {
        buy_amount -= btx.fee;
        buy_fee = btx.fee * buy_price;
    }

    let sell_tx = InwestomatTx {
        date: btx.date,
        ticker: crypto_ticker(sell_ticker),
        currency: Currency::Pln,
        tx_type: TxType::Sell,
        amount: sell_amount,
        price: sell_price,
        pln_rate: Decimal::ONE,
        nominal_price: Decimal::ONE,
        total_pln: sell_total_pln,
        fee: sell_fee,
        comment: String::new(),
    };
    let buy_tx = InwestomatTx {
        date: btx.date,
        ticker: crypto_ticker(buy_ticker),
        currency: Currency::Pln,
        tx_type: TxType::Buy,
        amount: buy_amount,
        price: buy_price,
        pln_rate: Decimal::ONE,
        nominal_price: Decimal::ONE,
        total_pln: buy_total_pln,
        fee: buy_fee,
        comment: String::new(),
    };

    [sell_tx, buy_tx]
}

/// The Inwestomat ticker for a cryptocurrency priced in PLN.
fn crypto_ticker(ticker: &str) -> Ticker {
    format!("CURRENCY:{ticker}PLN")
}

/// Convert XTB rows, pricing each through `client` with the average rate
/// in force on its (UTC+2) date.
pub fn convert_xtb_txs(
    client: &impl RateApi,
    txs: &[XtbTx],
    currency: Currency,
) -> Result<Vec<InwestomatTx>, ConvertError> {
    let offset = crate::util::spreadsheet_offset();
    let mut rows = Vec::new();

    for tx in txs {
        let date = tx.time().with_timezone(&offset).date_naive();
        let pln_rate = client.mid_rate(currency, date)?;

        rows.extend(convert_xtb_tx(tx, currency, pln_rate)?);
    }

    Ok(rows)
}

/// Convert one XTB operation into its Inwestomat rows.
///
/// Every operation produces an asset row. Accounts not denominated in PLN
/// additionally get a balancing cash row for the account currency.
pub fn convert_xtb_tx(
    tx: &XtbTx,
    currency: Currency,
    pln_rate: Decimal,
) -> Result<Vec<InwestomatTx>, ConvertError> {
    let comment = |id: &str| format!("ID:{id}");

    let (asset_tx, currency_tx) = match tx {
        XtbTx::BuySell(tx) => {
            let (asset_type, currency_type) = match tx.side {
                Side::Buy => (TxType::Buy, TxType::Sell),
                Side::Sell => (TxType::Sell, TxType::Buy),
            };
            let total_pln = tx.currency_amount.abs() * pln_rate;

            let asset_tx = InwestomatTx {
                date: tx.time,
                ticker: convert_xtb_ticker(&tx.symbol)?,
                currency,
                tx_type: asset_type,
                amount: tx.asset_amount,
                price: tx.price,
                pln_rate,
                nominal_price: Decimal::ONE,
                total_pln,
                fee: Decimal::ZERO,
                comment: comment(&tx.id),
            };
            let currency_tx = InwestomatTx {
                date: tx.time,
                ticker: currency.ticker(),
                currency,
                tx_type: currency_type,
                amount: tx.currency_amount.abs(),
                price: Decimal::ONE,
                pln_rate,
                nominal_price: Decimal::ONE,
                total_pln,
                fee: Decimal::ZERO,
                comment: comment(&tx.id),
            };

            (asset_tx, currency_tx)
        }

        XtbTx::DepositWithdraw(tx) => {
            let (asset_type, currency_type) = match tx.flow {
                CashFlow::Deposit => (TxType::Deposit, TxType::Buy),
                CashFlow::Withdraw => (TxType::Withdraw, TxType::Sell),
            };
            let total_pln = tx.currency_amount.abs() * pln_rate;

            let asset_tx = InwestomatTx {
                date: tx.time,
                ticker: Currency::Pln.ticker(),
                currency: Currency::Pln,
                tx_type: asset_type,
                amount: Decimal::ONE,
                price: Decimal::ONE,
                pln_rate: Decimal::ONE,
                nominal_price: Decimal::ONE,
                total_pln,
                fee: Decimal::ZERO,
                comment: comment(&tx.id),
            };
            let currency_tx = InwestomatTx {
                date: tx.time,
                ticker: currency.ticker(),
                currency,
                tx_type: currency_type,
                amount: tx.currency_amount.abs(),
                price: Decimal::ONE,
                pln_rate,
                nominal_price: Decimal::ONE,
                total_pln,
                fee: Decimal::ZERO,
                comment: comment(&tx.id),
            };

            (asset_tx, currency_tx)
        }

        XtbTx::DividendInterest(tx) => {
            let total_pln = tx.currency_amount.abs() * pln_rate;
            let ticker = if tx.symbol.is_empty() {
                currency.ticker()
            } else {
                convert_xtb_ticker(&tx.symbol)?
            };

            let asset_tx = InwestomatTx {
                date: tx.time,
                ticker,
                currency,
                tx_type: TxType::DividendInterest,
                amount: Decimal::ONE,
                price: Decimal::ONE,
                pln_rate,
                nominal_price: Decimal::ONE,
                total_pln,
                fee: Decimal::ZERO,
                comment: comment(&tx.id),
            };
            let currency_tx = InwestomatTx {
                date: tx.time,
                ticker: currency.ticker(),
                currency,
                tx_type: TxType::Buy,
                amount: tx.currency_amount.abs(),
                price: Decimal::ONE,
                pln_rate,
                nominal_price: Decimal::ONE,
                total_pln,
                fee: Decimal::ZERO,
                comment: comment(&tx.id),
            };

            (asset_tx, currency_tx)
        }

        XtbTx::Costs(tx) => {
            let total_pln = tx.currency_amount.abs() * pln_rate;
            let ticker = if tx.symbol.is_empty() {
                Currency::Pln.ticker()
            } else {
                convert_xtb_ticker(&tx.symbol)?
            };

            let asset_tx = InwestomatTx {
                date: tx.time,
                ticker,
                currency: Currency::Pln,
                tx_type: TxType::Costs,
                amount: Decimal::ONE,
                price: Decimal::ONE,
                pln_rate,
                nominal_price: Decimal::ONE,
                total_pln,
                fee: Decimal::ZERO,
                comment: comment(&tx.id),
            };
            let currency_tx = InwestomatTx {
                date: tx.time,
                ticker: currency.ticker(),
                currency,
                tx_type: TxType::Sell,
                amount: tx.currency_amount.abs(),
                price: Decimal::ONE,
                pln_rate,
                nominal_price: Decimal::ONE,
                total_pln,
                fee: Decimal::ZERO,
                comment: comment(&tx.id),
            };

            (asset_tx, currency_tx)
        }
    };

    if currency == Currency::Pln {
        Ok(vec![asset_tx])
    } else {
        Ok(vec![asset_tx, currency_tx])
    }
}

/// Map an XTB instrument ticker to its Inwestomat exchange-prefixed form.
pub fn convert_xtb_ticker(ticker: &str) -> Result<Ticker, ConvertError> {
    let (core, country) = ticker
        .split_once('.')
        .ok_or_else(|| ConvertError::MissingCountry(ticker.to_string()))?;

    match country {
        "PL" => Ok(format!("WSE:{core}")),
        "UK" => Ok(format!("LON:{core}")),
        unknown => Err(ConvertError::UnknownCountry(
            ticker.to_string(),
            unknown.to_string(),
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{XtbBuySell, XtbCosts, XtbDepositWithdraw, XtbDividendInterest};

    fn dec(s: &str) -> Decimal {
        s.parse().unwrap()
    }

    fn utc(s: &str) -> DateTime<Utc> {
        format!("{s}+0000").parse().unwrap()
    }

    /// A price source that refuses all lookups.
    struct NoKlines;

    impl KlineApi for NoKlines {
        fn close_price(&self, market: &Market, _: DateTime<Utc>) -> Result<Decimal, ClientError> {
            panic!("unexpected lookup for {market:?}");
        }
    }

    #[test]
    fn test_split_buy_transaction() {
        let date = utc("2024-05-05 00:34:09");
        let btx = BinanceTx {
            date,
            market: Market::new("ADA", "BTC"),
            side: Side::Buy,
            amount: dec("24"),
            price: dec("0.0000072"),
            total: dec("0.0001728"),
            fee: dec("0.024"),
            fee_coin: "ADA".to_string(),
        };
        let prices = PlnPrices {
            base: dec("1.8584496"),
            quote: dec("258118"),
        };

        let [first_tx, second_tx] = split_binance_tx(&btx, &prices);

        let expected = InwestomatTx {
            date,
            ticker: "CURRENCY:BTCPLN".to_string(),
            currency: Currency::Pln,
            tx_type: TxType::Sell,
            amount: dec("0.0001728"),
            price: dec("258118"),
            pln_rate: Decimal::ONE,
            nominal_price: Decimal::ONE,
            total_pln: dec("44.6027904"),
            fee: Decimal::ZERO,
            comment: String::new(),
        };
        assert_eq!(first_tx, expected);

        let expected = InwestomatTx {
            date,
            ticker: "CURRENCY:ADAPLN".to_string(),
            currency: Currency::Pln,
            tx_type: TxType::Buy,
            amount: dec("23.976"),
            price: dec("1.8584496"),
            pln_rate: Decimal::ONE,
            nominal_price: Decimal::ONE,
            total_pln: dec("44.6027904"),
            fee: dec("0.0446027904"),
            comment: String::new(),
        };
        assert_eq!(second_tx, expected);
    }

    #[test]
    fn test_split_sell_transaction() {
        let date = utc("2024-05-01 10:17:28");
        let btx = BinanceTx {
            date,
            market: Market::new("ADA", "BTC"),
            side: Side::Sell,
            amount: dec("24"),
            price: dec("0.00000757"),
            total: dec("0.00018168"),
            fee: dec("0.00000018"),
            fee_coin: "BTC".to_string(),
        };
        let prices = PlnPrices {
            base: dec("1.76500606"),
            quote: dec("233158"),
        };

        let [first_tx, second_tx] = split_binance_tx(&btx, &prices);

        let expected = InwestomatTx {
            date,
            ticker: "CURRENCY:ADAPLN".to_string(),
            currency: Currency::Pln,
            tx_type: TxType::Sell,
            amount: dec("24"),
            price: dec("1.76500606"),
            pln_rate: Decimal::ONE,
            nominal_price: Decimal::ONE,
            total_pln: dec("42.36014544"),
            fee: Decimal::ZERO,
            comment: String::new(),
        };
        assert_eq!(first_tx, expected);

        let expected = InwestomatTx {
            date,
            ticker: "CURRENCY:BTCPLN".to_string(),
            currency: Currency::Pln,
            tx_type: TxType::Buy,
            amount: dec("0.0001815"),
            price: dec("233158"),
            pln_rate: Decimal::ONE,
            nominal_price: Decimal::ONE,
            total_pln: dec("42.36014544"),
            fee: dec("0.04196844"),
            comment: String::new(),
        };
        assert_eq!(second_tx, expected);
    }

    #[test]
    fn test_find_pln_prices() {
        struct FakeKlines;

        impl KlineApi for FakeKlines {
            fn close_price(
                &self,
                market: &Market,
                time: DateTime<Utc>,
            ) -> Result<Decimal, ClientError> {
                assert_eq!(market, &Market::new("BTC", "PLN"));
                assert_eq!(time, "2024-05-01 10:17:28+0000".parse::<DateTime<Utc>>().unwrap());

                Ok("233158".parse().unwrap())
            }
        }

        let prices = find_pln_prices(
            &FakeKlines,
            &Market::new("ADA", "BTC"),
            dec("0.00000757"),
            utc("2024-05-01 10:17:28"),
        )
        .unwrap();

        let expected = PlnPrices {
            base: dec("1.76500606"),
            quote: dec("233158"),
        };
        assert_eq!(prices, expected);
    }

    #[test]
    fn test_find_pln_prices_for_pln_market() {
        // A market quoted directly in PLN needs no lookup at all.
        let prices = find_pln_prices(
            &NoKlines,
            &Market::new("BTC", "PLN"),
            dec("258118"),
            utc("2024-05-05 00:34:09"),
        )
        .unwrap();

        let expected = PlnPrices {
            base: dec("258118"),
            quote: Decimal::ONE,
        };
        assert_eq!(prices, expected);
    }

    #[test]
    fn test_pln_pricing_market() {
        let market = Market::new("ADA", "BTC");
        assert_eq!(pln_pricing_market(&market), Some(Market::new("BTC", "PLN")));

        let market = Market::new("BTC", "PLN");
        assert_eq!(pln_pricing_market(&market), None);
    }

    #[test]
    fn test_convert_xtb_buy() {
        let time = utc("2024-03-08 15:04:17");
        let tx = XtbTx::BuySell(XtbBuySell {
            id: "514921191".to_string(),
            side: Side::Buy,
            time,
            symbol: "CDR.PL".to_string(),
            asset_amount: dec("10"),
            price: dec("100"),
            currency_amount: dec("-1000"),
        });

        let rows = convert_xtb_tx(&tx, Currency::Usd, dec("4")).unwrap();

        assert_eq!(rows.len(), 2);
        let expected = InwestomatTx {
            date: time,
            ticker: "WSE:CDR".to_string(),
            currency: Currency::Usd,
            tx_type: TxType::Buy,
            amount: dec("10"),
            price: dec("100"),
            pln_rate: dec("4"),
            nominal_price: Decimal::ONE,
            total_pln: dec("4000"),
            fee: Decimal::ZERO,
            comment: "ID:514921191".to_string(),
        };
        assert_eq!(rows[0], expected);

        let expected = InwestomatTx {
            date: time,
            ticker: "Waluty_USD".to_string(),
            currency: Currency::Usd,
            tx_type: TxType::Sell,
            amount: dec("1000"),
            price: Decimal::ONE,
            pln_rate: dec("4"),
            nominal_price: Decimal::ONE,
            total_pln: dec("4000"),
            fee: Decimal::ZERO,
            comment: "ID:514921191".to_string(),
        };
        assert_eq!(rows[1], expected);
    }

    #[test]
    fn test_convert_xtb_sell_in_pln_account() {
        // PLN accounts get no balancing cash row.
        let time = utc("2024-03-11 09:00:02");
        let tx = XtbTx::BuySell(XtbBuySell {
            id: "515533188".to_string(),
            side: Side::Sell,
            time,
            symbol: "PKO.PL".to_string(),
            asset_amount: dec("5"),
            price: dec("51.20"),
            currency_amount: dec("256"),
        });

        let rows = convert_xtb_tx(&tx, Currency::Pln, Decimal::ONE).unwrap();

        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].ticker, "WSE:PKO");
        assert_eq!(rows[0].tx_type, TxType::Sell);
        assert_eq!(rows[0].total_pln, dec("256"));
    }

    #[test]
    fn test_convert_xtb_deposit() {
        let time = utc("2024-01-02 11:22:33");
        let tx = XtbTx::DepositWithdraw(XtbDepositWithdraw {
            id: "500000001".to_string(),
            flow: CashFlow::Deposit,
            time,
            currency_amount: dec("250"),
        });

        let rows = convert_xtb_tx(&tx, Currency::Eur, dec("4.33")).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].ticker, "Gotówka");
        assert_eq!(rows[0].currency, Currency::Pln);
        assert_eq!(rows[0].tx_type, TxType::Deposit);
        assert_eq!(rows[0].amount, Decimal::ONE);
        assert_eq!(rows[0].pln_rate, Decimal::ONE);
        assert_eq!(rows[0].total_pln, dec("1082.50"));

        assert_eq!(rows[1].ticker, "Waluty_EUR");
        assert_eq!(rows[1].tx_type, TxType::Buy);
        assert_eq!(rows[1].amount, dec("250"));
        assert_eq!(rows[1].pln_rate, dec("4.33"));
    }

    #[test]
    fn test_convert_xtb_dividend_without_symbol() {
        let time = utc("2024-06-14 14:00:00");
        let tx = XtbTx::DividendInterest(XtbDividendInterest {
            id: "520000002".to_string(),
            time,
            symbol: String::new(),
            currency_amount: dec("1.23"),
        });

        let rows = convert_xtb_tx(&tx, Currency::Usd, dec("4.05")).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].ticker, "Waluty_USD");
        assert_eq!(rows[0].tx_type, TxType::DividendInterest);
        assert_eq!(rows[0].total_pln, dec("4.9815"));
        assert_eq!(rows[1].tx_type, TxType::Buy);
        assert_eq!(rows[1].amount, dec("1.23"));
    }

    #[test]
    fn test_convert_xtb_costs() {
        let time = utc("2024-06-14 14:00:00");
        let tx = XtbTx::Costs(XtbCosts {
            id: "520000003".to_string(),
            time,
            symbol: "TSLA.UK".to_string(),
            currency_amount: dec("-0.37"),
        });

        let rows = convert_xtb_tx(&tx, Currency::Usd, dec("4.05")).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].ticker, "LON:TSLA");
        assert_eq!(rows[0].currency, Currency::Pln);
        assert_eq!(rows[0].tx_type, TxType::Costs);
        assert_eq!(rows[0].total_pln, dec("1.4985"));
        assert_eq!(rows[1].tx_type, TxType::Sell);
        assert_eq!(rows[1].amount, dec("0.37"));
    }

    #[test]
    fn test_convert_xtb_ticker() {
        assert_eq!(convert_xtb_ticker("CDR.PL").unwrap(), "WSE:CDR");
        assert_eq!(convert_xtb_ticker("VUSA.UK").unwrap(), "LON:VUSA");

        assert!(matches!(
            convert_xtb_ticker("AAPL.US"),
            Err(ConvertError::UnknownCountry(_, _)),
        ));
        assert!(matches!(
            convert_xtb_ticker("AAPL"),
            Err(ConvertError::MissingCountry(_)),
        ));
    }

    #[test]
    fn test_convert_xtb_txs_uses_rate_for_local_date() {
        // 23:30 UTC on May 1st is already May 2nd in the sheet's timezone.
        struct FakeRates;

        impl RateApi for FakeRates {
            fn mid_rate(
                &self,
                currency: Currency,
                date: chrono::NaiveDate,
            ) -> Result<Decimal, ClientError> {
                assert_eq!(currency, Currency::Usd);
                assert_eq!(date, "2024-05-02".parse::<chrono::NaiveDate>().unwrap());

                Ok("4.0474".parse().unwrap())
            }
        }

        let txs = [XtbTx::DepositWithdraw(XtbDepositWithdraw {
            id: "500000009".to_string(),
            flow: CashFlow::Withdraw,
            time: utc("2024-05-01 23:30:00"),
            currency_amount: dec("-100"),
        })];

        let rows = convert_xtb_txs(&FakeRates, &txs, Currency::Usd).unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].tx_type, TxType::Withdraw);
        assert_eq!(rows[0].total_pln, dec("404.74"));
        assert_eq!(rows[1].tx_type, TxType::Sell);
    }
}
