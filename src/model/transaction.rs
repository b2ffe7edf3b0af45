use crate::model::{Currency, Market, Ticker};
use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

/// Transaction kinds recognized by the Inwestomat sheet.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum TxType {
    Buy,
    Sell,
    Deposit,
    Withdraw,
    DividendInterest,
    Costs,
    Split,
}

impl TxType {
    /// The Polish label written to the `Rodzaj transakcji` column.
    pub fn as_pl(self) -> &'static str {
        match self {
            Self::Buy => "Zakup",
            Self::Sell => "Sprzedaż",
            Self::Deposit => "Wpłata środków",
            Self::Withdraw => "Wypłata środków",
            Self::DividendInterest => "Dywidenda / Odsetki",
            Self::Costs => "Koszty",
            Self::Split => "Split",
        }
    }
}

/// Which side of a market an exchange trade took.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Side {
    Buy,
    Sell,
}

/// Direction of an account cash transfer.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum CashFlow {
    Deposit,
    Withdraw,
}

/// A single row of the Binance spot trade history export.
#[derive(Clone, Debug, PartialEq)]
pub struct BinanceTx {
    pub date: DateTime<Utc>,
    pub market: Market,
    pub side: Side,
    pub amount: Decimal,
    pub price: Decimal,
    pub total: Decimal,
    pub fee: Decimal,
    pub fee_coin: Ticker,
}

/// A stock/ETF buy or sell from the XTB cash operations export.
#[derive(Clone, Debug, PartialEq)]
pub struct XtbBuySell {
    pub id: String,
    pub side: Side,
    pub time: DateTime<Utc>,
    pub symbol: Ticker,
    pub asset_amount: Decimal,
    pub price: Decimal,
    pub currency_amount: Decimal,
}

/// An account deposit or withdrawal from the XTB export.
#[derive(Clone, Debug, PartialEq)]
pub struct XtbDepositWithdraw {
    pub id: String,
    pub flow: CashFlow,
    pub time: DateTime<Utc>,
    pub currency_amount: Decimal,
}

/// A dividend or free-funds interest payment from the XTB export.
#[derive(Clone, Debug, PartialEq)]
pub struct XtbDividendInterest {
    pub id: String,
    pub time: DateTime<Utc>,
    pub symbol: Ticker,
    pub currency_amount: Decimal,
}

/// A tax charge (on dividends or interest) from the XTB export.
#[derive(Clone, Debug, PartialEq)]
pub struct XtbCosts {
    pub id: String,
    pub time: DateTime<Utc>,
    pub symbol: Ticker,
    pub currency_amount: Decimal,
}

/// Any row of the XTB cash operations export.
#[derive(Clone, Debug, PartialEq)]
pub enum XtbTx {
    BuySell(XtbBuySell),
    DepositWithdraw(XtbDepositWithdraw),
    DividendInterest(XtbDividendInterest),
    Costs(XtbCosts),
}

impl XtbTx {
    pub fn time(&self) -> DateTime<Utc> {
        match self {
            Self::BuySell(tx) => tx.time,
            Self::DepositWithdraw(tx) => tx.time,
            Self::DividendInterest(tx) => tx.time,
            Self::Costs(tx) => tx.time,
        }
    }
}

/// A fully priced row of the Inwestomat transactions sheet.
#[derive(Clone, Debug, PartialEq)]
pub struct InwestomatTx {
    pub date: DateTime<Utc>,
    pub ticker: Ticker,
    pub currency: Currency,
    pub tx_type: TxType,
    pub amount: Decimal,
    pub price: Decimal,
    pub pln_rate: Decimal,
    pub nominal_price: Decimal,
    pub total_pln: Decimal,
    pub fee: Decimal,
    pub comment: String,
}
