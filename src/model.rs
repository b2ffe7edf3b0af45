pub use self::{convert::*, currency::*, market::*, stats::*, transaction::*};

pub mod convert;
pub(crate) mod currency;
pub(crate) mod market;
mod stats;
pub(crate) mod transaction;
