//! 回放：从 CSV 读入1分钟K线，驱动多级别信号引擎，输出信号表 JSON。
//!
//! 用法：replay <bars.csv> <symbol> [config.yaml]

use chanlyze::{BarGenerator, EngineConfig, SignalEngine, load_bars_csv};
use tracing::info;

const WARMUP_BARS: usize = 500;

fn main() {
    chanlyze::init_logging();

    let args: Vec<String> = std::env::args().collect();
    if args.len() < 3 {
        eprintln!("usage: replay <bars.csv> <symbol> [config.yaml]");
        std::process::exit(2);
    }

    let config = match args.get(3) {
        Some(path) => match EngineConfig::load(path) {
            Ok(config) => config,
            Err(error) => {
                eprintln!("failed to load config {}: {error}", args[3]);
                std::process::exit(1);
            }
        },
        None => EngineConfig::default(),
    };

    if let Err(error) = run(&args[1], &args[2], &config) {
        eprintln!("replay failed: {error}");
        std::process::exit(1);
    }
}

fn run(csv_path: &str, symbol: &str, config: &EngineConfig) -> Result<(), chanlyze::AnalyzeError> {
    let bars = load_bars_csv(csv_path, symbol)?;
    info!(bars = bars.len(), symbol, "bars loaded");

    let freqs = config.parsed_freqs()?;
    let mut generator = BarGenerator::new(config.max_count, Some(freqs));

    let warmup = WARMUP_BARS.min(bars.len().saturating_sub(1));
    for bar in &bars[..warmup] {
        generator.update(bar.clone())?;
    }

    let mut engine = SignalEngine::from_generator(&generator, config.max_count)?;
    for bar in &bars[warmup..] {
        generator.update(bar.clone())?;
        engine.update(&generator)?;
    }
    info!(end_dt = %engine.end_dt(), latest_price = engine.latest_price(), "replay done");

    let signals = engine.signals();
    println!(
        "{}",
        serde_json::to_string_pretty(&signals).expect("signal table is valid json")
    );
    Ok(())
}
