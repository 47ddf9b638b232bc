use std::collections::BTreeMap;

use chrono::{DateTime, TimeZone, Utc};
use serde_json::{Map, Value, json};

use chanlyze::{
    Analyzer, AnalyzerConfig, Bar, BarGenerator, Freq, SignalEngine, bi_signals, fx_signals,
    xd_signals,
};

fn base_dt() -> DateTime<Utc> {
    Utc.with_ymd_and_hms(2020, 7, 1, 9, 31, 0).unwrap()
}

fn sample_bars(count: usize) -> Vec<Bar> {
    let steps = [2.0, 1.5, 0.8, -1.2, -2.0, 0.5, 1.8, -0.7, -1.1, 2.2];
    let mut high = 100.0_f64;
    let mut bars = Vec::with_capacity(count);
    for i in 0..count {
        let step = steps[i % steps.len()];
        high += step;
        let low = high - 1.0;
        let (open, close) = if step >= 0.0 {
            (low + 0.1, high - 0.1)
        } else {
            (high - 0.1, low + 0.1)
        };
        bars.push(Bar {
            symbol: "000001.SH".to_string(),
            dt: base_dt() + chrono::Duration::minutes(i as i64),
            open,
            high,
            low,
            close,
            vol: 100.0 + i as f64,
        });
    }
    bars
}

fn flag(s: &Map<String, Value>, key: &str) -> bool {
    s.get(key).and_then(Value::as_bool).unwrap_or_else(|| panic!("missing flag {key}"))
}

#[test]
fn signal_tables_on_a_short_history_hold_prefixed_defaults() {
    // five monotonically rising bars: no fractal, no stroke, no segment
    let bars: Vec<Bar> = (0..5)
        .map(|i| {
            let high = 100.0 + i as f64;
            Bar {
                symbol: "T".to_string(),
                dt: base_dt() + chrono::Duration::minutes(i),
                open: high - 0.9,
                high,
                low: high - 1.0,
                close: high - 0.1,
                vol: 10.0,
            }
        })
        .collect();
    let ka = Analyzer::new(
        bars,
        AnalyzerConfig {
            name: "日线".to_string(),
            ..AnalyzerConfig::default()
        },
    )
    .unwrap();
    assert!(ka.fractals().is_empty());

    let fx = fx_signals(&ka);
    assert!(!flag(&fx, "日线收于MA5上方"));
    assert!(!flag(&fx, "日线最后一个分型为顶"));
    assert_eq!(fx.get("日线最近三K线形态"), Some(&json!("up")));

    let bi = bi_signals(&ka);
    assert!(!flag(&bi, "日线最后一个未确认的笔标记为底"));
    assert!(!flag(&bi, "日线笔同级别分解买"));
    assert_eq!(bi.get("日线最后一个笔中枢上沿"), Some(&json!(0)));

    let xd = xd_signals(&ka);
    assert!(!flag(&xd, "日线最后一个未确认的线段标记为底"));
    assert_eq!(xd.get("日线最后一个线段内部笔标记数量"), Some(&json!(0)));
}

#[test]
fn ma_flags_pick_exactly_one_side_once_history_is_deep_enough() {
    let ka = Analyzer::new(
        sample_bars(100),
        AnalyzerConfig {
            name: "1分钟".to_string(),
            ..AnalyzerConfig::default()
        },
    )
    .unwrap();

    let s = fx_signals(&ka);
    for (above, below) in [
        ("1分钟收于MA5上方", "1分钟收于MA5下方"),
        ("1分钟收于MA20上方", "1分钟收于MA20下方"),
        ("1分钟收于MA120上方", "1分钟收于MA120下方"),
    ] {
        assert_ne!(flag(&s, above), flag(&s, below), "{above} and {below} must disagree");
    }
    // a fractal exists in this zig-zag, so one polarity flag is set
    assert_ne!(
        flag(&s, "1分钟最后一个分型为顶"),
        flag(&s, "1分钟最后一个分型为底")
    );
}

#[test]
fn stroke_table_reports_polarity_and_extension_state() {
    let ka = Analyzer::new(
        sample_bars(100),
        AnalyzerConfig {
            name: "1分钟".to_string(),
            ..AnalyzerConfig::default()
        },
    )
    .unwrap();
    assert!(ka.strokes().len() > 2);

    let s = bi_signals(&ka);
    assert_ne!(
        flag(&s, "1分钟最后一个未确认的笔标记为底"),
        flag(&s, "1分钟最后一个未确认的笔标记为顶")
    );
    assert_ne!(
        flag(&s, "1分钟最后一个已确认的笔标记为底"),
        flag(&s, "1分钟最后一个已确认的笔标记为顶")
    );
    let extensions = [
        "1分钟向上笔走势延伸",
        "1分钟向上笔现顶分型",
        "1分钟向下笔走势延伸",
        "1分钟向下笔现底分型",
    ];
    let active = extensions.iter().filter(|k| flag(&s, k)).count();
    assert_eq!(active, 1, "exactly one stroke extension state at a time");
}

#[test]
fn engine_merges_prefixed_tables_across_frequencies() {
    let bars = sample_bars(120);
    let mut generator = BarGenerator::new(1000, Some(vec![Freq::M1, Freq::M5]));
    for bar in &bars[..100] {
        generator.update(bar.clone()).unwrap();
    }

    let mut klines = BTreeMap::new();
    klines.insert(Freq::M1, generator.bars(Freq::M1, 1000));
    klines.insert(Freq::M5, generator.bars(Freq::M5, 1000));
    let mut engine = SignalEngine::new(klines).unwrap();
    assert_eq!(engine.symbol(), "000001.SH");

    for bar in &bars[100..] {
        generator.update(bar.clone()).unwrap();
        engine.update(&generator).unwrap();
    }
    assert_eq!(engine.end_dt(), bars.last().unwrap().dt);

    let s = engine.signals();
    assert_eq!(s.get("symbol"), Some(&json!("000001.SH")));
    for key in [
        "1分钟收于MA5上方",
        "1分钟最后一个未确认的笔标记为底",
        "1分钟最后一个未确认的线段标记为底",
        "5分钟收于MA5上方",
        "5分钟最后一个未确认的笔标记为底",
        "5分钟最后一个未确认的线段标记为底",
    ] {
        assert!(s.contains_key(key), "missing signal key {key}");
    }
}

#[test]
fn engine_from_generator_skips_frequencies_without_history() {
    let bars = sample_bars(60);
    let mut generator = BarGenerator::new(1000, Some(vec![Freq::M1, Freq::M5, Freq::D1]));
    for bar in &bars {
        generator.update(bar.clone()).unwrap();
    }

    // one trading hour of data: the daily series has a single bar and is
    // dropped, minute frequencies stay
    let engine = SignalEngine::from_generator(&generator, 1000).unwrap();
    assert!(engine.analyzer(Freq::M1).is_some());
    assert!(engine.analyzer(Freq::M5).is_some());
    assert!(engine.analyzer(Freq::D1).is_none());
}
