pub mod binance;
pub mod xtb;
