use std::{fmt, str::FromStr};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CurrencyError {
    #[error("Unknown currency: {0}")]
    Unknown(String),
}

/// Account denomination currencies supported by the Inwestomat sheet.
#[derive(Copy, Clone, Debug, Eq, Hash, PartialEq)]
pub enum Currency {
    Pln,
    Usd,
    Eur,
    Gbp,
    Chf,
}

impl Currency {
    /// ISO 4217 code, as written in the `Waluta` output column and in NBP
    /// API paths.
    pub fn code(self) -> &'static str {
        match self {
            Self::Pln => "PLN",
            Self::Usd => "USD",
            Self::Eur => "EUR",
            Self::Gbp => "GBP",
            Self::Chf => "CHF",
        }
    }

    /// The Inwestomat ticker for the cash position held in this currency.
    pub fn ticker(self) -> String {
        match self {
            Self::Pln => "Gotówka".to_string(),
            currency => format!("Waluty_{}", currency.code()),
        }
    }
}

impl fmt::Display for Currency {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.code())
    }
}

impl FromStr for Currency {
    type Err = CurrencyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "PLN" => Ok(Self::Pln),
            "USD" => Ok(Self::Usd),
            "EUR" => Ok(Self::Eur),
            "GBP" => Ok(Self::Gbp),
            "CHF" => Ok(Self::Chf),
            unknown => Err(CurrencyError::Unknown(unknown.to_string())),
        }
    }
}
