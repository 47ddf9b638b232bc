pub mod analyzer;
pub mod bar;
pub mod constant;
pub mod fractal;
pub mod generator;
pub mod indicator;
pub mod input;
pub mod logging;
pub mod orchestrator;
pub mod pivot;
pub mod power;
pub mod segment;
pub mod settings;
pub mod signal;
pub mod stroke;
pub mod well;
mod merge;
mod utils;

pub use analyzer::{Analyzer, AnalyzerConfig, SubSection};
pub use bar::{Bar, MergedBar};
pub use constant::{
    AnalyzeError, BiMode, Const, Direction, Freq, Mark, PowerMode, SectionMode,
};
pub use fractal::{Fractal, has_gap};
pub use generator::BarGenerator;
pub use indicator::{IndicatorCache, MaRow, MacdRow};
pub use input::load_bars_csv;
pub use logging::init_logging;
pub use orchestrator::SignalEngine;
pub use pivot::{Pivot, ZSegment, find_pivots};
pub use power::{PowerSpan, divergence, macd_power, vol_power};
pub use segment::{Endpoint, StdInterval, is_valid_xd, standard_sequence};
pub use settings::EngineConfig;
pub use signal::{bi_signals, fx_signals, xd_signals};
pub use stroke::Stroke;
pub use well::{MoveSpan, Well, check_well};
