//! 多级别编排。
//!
//! 每个级别持有一个分析器，汇总各级别的分型/笔/线段信号表；线段信号
//! 不在周线上计算。

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde_json::{Map, Value, json};
use tracing::warn;

use crate::analyzer::{Analyzer, AnalyzerConfig};
use crate::bar::Bar;
use crate::constant::{AnalyzeError, Freq};
use crate::generator::BarGenerator;
use crate::signal;

pub struct SignalEngine {
    analyzers: BTreeMap<Freq, Analyzer>,
    symbol: String,
    end_dt: DateTime<Utc>,
    latest_price: f64,
}

impl SignalEngine {
    /// 从各级别的初始K线历史构建；每个级别至少需要4根K线。
    pub fn new(klines: BTreeMap<Freq, Vec<Bar>>) -> Result<Self, AnalyzeError> {
        if klines.is_empty() {
            return Err(AnalyzeError::Precondition(
                "signal engine needs at least one freq".to_string(),
            ));
        }

        let mut analyzers = BTreeMap::new();
        for (freq, bars) in klines {
            let config = AnalyzerConfig {
                name: freq.label().to_string(),
                max_raw_len: 5_000,
                ma_params: vec![5, 20, 120],
                ..AnalyzerConfig::default()
            };
            analyzers.insert(freq, Analyzer::new(bars, config)?);
        }

        let base = analyzers
            .get(&Freq::M1)
            .or_else(|| analyzers.values().next())
            .expect("checked non-empty");
        let (symbol, end_dt, latest_price) = (
            base.symbol().to_string(),
            base.end_dt(),
            base.latest_price(),
        );
        Ok(Self {
            analyzers,
            symbol,
            end_dt,
            latest_price,
        })
    }

    /// 用生成器的初始序列构建，K线不足4根的级别被跳过。
    pub fn from_generator(
        generator: &BarGenerator,
        count_per_freq: usize,
    ) -> Result<Self, AnalyzeError> {
        let mut klines = BTreeMap::new();
        for freq in generator.freqs() {
            let bars = generator.bars(*freq, count_per_freq);
            if bars.len() < 4 {
                warn!(freq = freq.label(), bars = bars.len(), "freq skipped, not enough bars");
                continue;
            }
            klines.insert(*freq, bars);
        }
        Self::new(klines)
    }

    /// 将生成器各级别的最新K线喂给对应分析器。
    pub fn update(&mut self, generator: &BarGenerator) -> Result<(), AnalyzeError> {
        for (freq, ka) in &mut self.analyzers {
            if let Some(last) = generator.latest(*freq) {
                ka.update(last.clone())?;
            }
        }

        if let Some(base) = self
            .analyzers
            .get(&Freq::M1)
            .or_else(|| self.analyzers.values().next())
        {
            self.symbol = base.symbol().to_string();
            self.end_dt = base.end_dt();
            self.latest_price = base.latest_price();
        }
        Ok(())
    }

    /// 汇总所有级别的信号表。
    pub fn signals(&self) -> Map<String, Value> {
        let mut s = Map::new();
        s.insert("symbol".to_string(), json!(self.symbol));
        for (freq, ka) in &self.analyzers {
            s.extend(signal::fx_signals(ka));
            s.extend(signal::bi_signals(ka));
            if *freq != Freq::W1 {
                s.extend(signal::xd_signals(ka));
            }
        }
        s
    }

    pub fn analyzer(&self, freq: Freq) -> Option<&Analyzer> {
        self.analyzers.get(&freq)
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn end_dt(&self) -> DateTime<Utc> {
        self.end_dt
    }

    pub fn latest_price(&self) -> f64 {
        self.latest_price
    }
}
