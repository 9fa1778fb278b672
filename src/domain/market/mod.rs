pub mod candle;
pub mod interval;
pub mod kline;
pub mod ticker;
pub mod timeframe;

pub use candle::{IndicatorSet, NormalizedCandle, ProcessedCandle};
pub use interval::KlineInterval;
pub use kline::{KLINE_COLUMNS, RawKline};
pub use ticker::{AggTrade, Ticker24h};
pub use timeframe::Timeframe;
