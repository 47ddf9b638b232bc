pub mod cache;
pub mod macd;
pub mod sma;

pub use cache::{IndicatorCache, MaRow, MacdRow};
pub use macd::{ema, macd};
pub use sma::sma;
