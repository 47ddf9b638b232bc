//! 单级别分析器。
//!
//! 持有某一级别的全部层级序列（原始K线 → 合并K线 → 分型 → 笔 →
//! 线段）并在每根K线到达时自底向上增量刷新；各层只保留有限的可回溯
//! 尾部，前缀不可变。

use chrono::{DateTime, Utc};
use serde::Deserialize;
use tracing::debug;

use crate::bar::{Bar, MergedBar};
use crate::constant::{AnalyzeError, BiMode, Direction, PowerMode, SectionMode};
use crate::fractal::{self, Fractal};
use crate::indicator::{IndicatorCache, MaRow, MacdRow};
use crate::merge;
use crate::power::{self, PowerSpan};
use crate::segment::{self, Endpoint};
use crate::stroke::{self, Stroke};
use crate::utils::tail;

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AnalyzerConfig {
    pub name: String,
    pub bi_mode: BiMode,
    pub max_raw_len: usize,
    pub ma_params: Vec<usize>,
    pub verbose: bool,
}

impl Default for AnalyzerConfig {
    fn default() -> Self {
        Self {
            name: "本级别".to_string(),
            bi_mode: BiMode::Old,
            max_raw_len: 10_000,
            ma_params: vec![5, 20, 120],
            verbose: false,
        }
    }
}

/// `get_sub_section` 的结果，层级由调用方给定的 mode 决定。
#[derive(Debug, Clone, PartialEq)]
pub enum SubSection {
    Merged(Vec<MergedBar>),
    Fractals(Vec<Fractal>),
    Strokes(Vec<Stroke>),
    Segments(Vec<Endpoint>),
}

#[derive(Debug, Clone)]
pub struct Analyzer {
    name: String,
    symbol: String,
    bi_mode: BiMode,
    max_raw_len: usize,
    verbose: bool,
    start_dt: DateTime<Utc>,
    end_dt: DateTime<Utc>,
    latest_price: f64,
    bars: Vec<Bar>,
    merged: Vec<MergedBar>,
    indicators: IndicatorCache,
    fractals: Vec<Fractal>,
    strokes: Vec<Stroke>,
    segments: Vec<Endpoint>,
}

impl Analyzer {
    pub fn new(bars: Vec<Bar>, config: AnalyzerConfig) -> Result<Self, AnalyzeError> {
        if bars.len() < 4 {
            return Err(AnalyzeError::Precondition(format!(
                "analyzer needs at least 4 bars, got {}",
                bars.len()
            )));
        }
        for pair in bars.windows(2) {
            if pair[1].dt <= pair[0].dt {
                return Err(AnalyzeError::Precondition(format!(
                    "bar dt must increase: {} then {}",
                    pair[0].dt, pair[1].dt
                )));
            }
        }

        let mut bars = bars;
        if bars.len() > config.max_raw_len {
            let drop = bars.len() - config.max_raw_len;
            bars.drain(..drop);
        }

        let mut analyzer = Self {
            name: config.name,
            symbol: bars[0].symbol.clone(),
            bi_mode: config.bi_mode,
            max_raw_len: config.max_raw_len,
            verbose: config.verbose,
            start_dt: bars[0].dt,
            end_dt: bars[bars.len() - 1].dt,
            latest_price: bars[bars.len() - 1].close,
            bars,
            merged: Vec::new(),
            indicators: IndicatorCache::new(config.ma_params),
            fractals: Vec::new(),
            strokes: Vec::new(),
            segments: Vec::new(),
        };
        analyzer.refresh_layers()?;
        Ok(analyzer)
    }

    /// 输入一根新K线。`open` 与最后一根相同视为未完成K线的覆盖，否则
    /// 要求 `dt` 严格递增并追加。
    pub fn update(&mut self, bar: Bar) -> Result<(), AnalyzeError> {
        let n = self.bars.len();
        let (last_open, last_dt) = (self.bars[n - 1].open, self.bars[n - 1].dt);
        if bar.open == last_open {
            if bar.dt < last_dt {
                return Err(AnalyzeError::Precondition(format!(
                    "in-progress bar dt {} behind last bar dt {last_dt}",
                    bar.dt
                )));
            }
            if self.verbose {
                debug!(dt = %bar.dt, close = bar.close, "in-progress bar replaced");
            }
            self.bars[n - 1] = bar;
        } else {
            if bar.dt <= last_dt {
                return Err(AnalyzeError::Precondition(format!(
                    "bar dt {} does not advance past {last_dt}",
                    bar.dt
                )));
            }
            self.bars.push(bar);
        }

        self.refresh_layers()?;
        self.end_dt = self.bars[self.bars.len() - 1].dt;
        self.latest_price = self.bars[self.bars.len() - 1].close;

        if self.bars.len() > self.max_raw_len {
            self.trim();
        }
        Ok(())
    }

    fn refresh_layers(&mut self) -> Result<(), AnalyzeError> {
        self.indicators.update(&self.bars)?;
        merge::update_merged(&mut self.merged, &self.bars);
        fractal::update_fractals(&mut self.fractals, &self.merged);
        stroke::update_strokes(
            &mut self.strokes,
            &self.fractals,
            &self.merged,
            &self.bars,
            self.bi_mode,
        );
        segment::update_segments(&mut self.segments, &self.strokes);
        if self.verbose {
            debug!(
                bars = self.bars.len(),
                merged = self.merged.len(),
                fractals = self.fractals.len(),
                strokes = self.strokes.len(),
                segments = self.segments.len(),
                "layers refreshed"
            );
        }
        Ok(())
    }

    fn trim(&mut self) {
        let keep = self.max_raw_len;
        self.bars.drain(..self.bars.len() - keep);
        if self.merged.len() > keep {
            self.merged.drain(..self.merged.len() - keep);
        }
        self.indicators.trim(keep);

        let cutoff = self.merged[0].dt;
        self.fractals.retain(|x| x.dt > cutoff);
        self.strokes.retain(|x| x.dt > cutoff);
        self.segments.retain(|x| x.dt > cutoff);
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn symbol(&self) -> &str {
        &self.symbol
    }

    pub fn bi_mode(&self) -> BiMode {
        self.bi_mode
    }

    pub fn start_dt(&self) -> DateTime<Utc> {
        self.start_dt
    }

    pub fn end_dt(&self) -> DateTime<Utc> {
        self.end_dt
    }

    pub fn latest_price(&self) -> f64 {
        self.latest_price
    }

    pub fn bars(&self) -> &[Bar] {
        &self.bars
    }

    pub fn merged_bars(&self) -> &[MergedBar] {
        &self.merged
    }

    pub fn ma_rows(&self) -> &[MaRow] {
        self.indicators.ma_rows()
    }

    pub fn macd_rows(&self) -> &[MacdRow] {
        self.indicators.macd_rows()
    }

    pub fn fractals(&self) -> &[Fractal] {
        &self.fractals
    }

    pub fn strokes(&self) -> &[Stroke] {
        &self.strokes
    }

    pub fn segments(&self) -> &[Endpoint] {
        &self.segments
    }

    /// 判断 zs1（近段）对 zs2（前段）是否背驰；`last_index` 限制参与
    /// 比较的 MACD 行数以加速最近走势的判断。
    pub fn is_bei_chi(
        &self,
        zs1: &PowerSpan,
        zs2: &PowerSpan,
        mode: PowerMode,
        adjust: f64,
        last_index: Option<usize>,
    ) -> Result<bool, AnalyzeError> {
        let rows = match last_index {
            Some(n) => tail(self.indicators.macd_rows(), n),
            None => self.indicators.macd_rows(),
        };
        power::divergence(rows, zs1, zs2, mode, adjust)
    }

    pub fn calculate_macd_power(
        &self,
        start_dt: DateTime<Utc>,
        end_dt: DateTime<Utc>,
        mode: PowerMode,
        direction: Direction,
    ) -> f64 {
        power::macd_power(self.indicators.macd_rows(), start_dt, end_dt, mode, direction)
    }

    pub fn calculate_vol_power(&self, start_dt: DateTime<Utc>, end_dt: DateTime<Utc>) -> i64 {
        power::vol_power(&self.bars, start_dt, end_dt)
    }

    /// 取 `[start_dt, end_dt]` 窗口内某一层的切片；`is_last` 表示查询
    /// 的是最近一段，只在各层的尾部窗口内检索。
    pub fn get_sub_section(
        &self,
        start_dt: DateTime<Utc>,
        end_dt: DateTime<Utc>,
        mode: SectionMode,
        is_last: bool,
    ) -> SubSection {
        fn window<T: Clone>(
            values: &[T],
            limit: usize,
            is_last: bool,
            in_range: impl Fn(&T) -> bool,
        ) -> Vec<T> {
            let source = if is_last {
                &values[values.len().saturating_sub(limit)..]
            } else {
                values
            };
            source.iter().filter(|x| in_range(x)).cloned().collect()
        }

        match mode {
            SectionMode::Kn => SubSection::Merged(window(&self.merged, 200, is_last, |x| {
                start_dt <= x.dt && x.dt <= end_dt
            })),
            SectionMode::Fx => SubSection::Fractals(window(&self.fractals, 100, is_last, |x| {
                start_dt <= x.dt && x.dt <= end_dt
            })),
            SectionMode::Bi => SubSection::Strokes(window(&self.strokes, 50, is_last, |x| {
                start_dt <= x.dt && x.dt <= end_dt
            })),
            SectionMode::Xd => SubSection::Segments(window(&self.segments, 30, is_last, |x| {
                start_dt <= x.dt && x.dt <= end_dt
            })),
        }
    }
}
