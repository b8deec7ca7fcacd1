//! Domain types: bars, series, signals, trades, equity points.

pub mod bar;
pub mod equity;
pub mod series;
pub mod signal;
pub mod trade;

pub use bar::PriceBar;
pub use equity::EquityPoint;
pub use series::{PriceSeries, SeriesError};
pub use signal::Signal;
pub use trade::TradeRecord;
