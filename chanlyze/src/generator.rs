//! 多级别K线生成器。
//!
//! 输入1分钟K线，维护各粗级别的未完成K线：分钟级桶在上一根K线的分钟
//! 数为桶宽整数倍且新K线不是时开启新桶（即次周期首根K线收桶），日线
//! 按日期切换，周线按首个周一K线切换。

use std::collections::BTreeMap;

use chrono::{DateTime, Datelike, Timelike, Utc, Weekday};

use crate::bar::Bar;
use crate::constant::{AnalyzeError, Freq};

pub struct BarGenerator {
    max_count: usize,
    freqs: Vec<Freq>,
    series: BTreeMap<Freq, Vec<Bar>>,
    symbol: Option<String>,
    end_dt: Option<DateTime<Utc>>,
}

impl BarGenerator {
    pub fn new(max_count: usize, freqs: Option<Vec<Freq>>) -> Self {
        let freqs = freqs.unwrap_or_else(|| Freq::ALL.to_vec());
        Self {
            max_count,
            freqs,
            series: BTreeMap::new(),
            symbol: None,
            end_dt: None,
        }
    }

    /// 输入一根1分钟K线（`dt` 为收盘时间），刷新所有级别。
    pub fn update(&mut self, bar: Bar) -> Result<(), AnalyzeError> {
        self.end_dt = Some(bar.dt);
        self.symbol = Some(bar.symbol.clone());
        for freq in self.freqs.clone() {
            self.update_freq(freq, &bar)?;
        }
        Ok(())
    }

    fn update_freq(&mut self, freq: Freq, k: &Bar) -> Result<(), AnalyzeError> {
        let max_count = self.max_count;
        let series = self.series.entry(freq).or_default();
        if series.is_empty() {
            series.push(k.clone());
            return Ok(());
        }
        let last_dt = series[series.len() - 1].dt;

        let opens_bucket = match freq {
            Freq::M1 => {
                if k.dt < last_dt {
                    return Err(AnalyzeError::Precondition(format!(
                        "1-minute bar dt {} behind last dt {last_dt}",
                        k.dt
                    )));
                }
                if k.dt == last_dt {
                    let n = series.len();
                    series[n - 1] = k.clone();
                    return Ok(());
                }
                true
            }
            Freq::M5 | Freq::M15 | Freq::M30 | Freq::M60 => {
                let width = freq.minutes().expect("minute freq");
                last_dt.minute() % width == 0 && k.dt.minute() % width != 0
            }
            Freq::D1 => k.dt.date_naive() != last_dt.date_naive(),
            Freq::W1 => k.dt.weekday() == Weekday::Mon && last_dt.weekday() != Weekday::Mon,
        };

        if opens_bucket {
            series.push(k.clone());
        } else {
            let n = series.len();
            let last = &mut series[n - 1];
            last.dt = k.dt;
            last.close = k.close;
            last.high = last.high.max(k.high);
            last.low = last.low.min(k.low);
            last.vol += k.vol;
        }

        if series.len() > max_count {
            let drop = series.len() - max_count;
            series.drain(..drop);
        }
        Ok(())
    }

    pub fn freqs(&self) -> &[Freq] {
        &self.freqs
    }

    pub fn symbol(&self) -> Option<&str> {
        self.symbol.as_deref()
    }

    pub fn end_dt(&self) -> Option<DateTime<Utc>> {
        self.end_dt
    }

    /// 某一级别最近 `count` 根K线。
    pub fn bars(&self, freq: Freq, count: usize) -> Vec<Bar> {
        self.series
            .get(&freq)
            .map(|xs| xs[xs.len().saturating_sub(count)..].to_vec())
            .unwrap_or_default()
    }

    pub fn latest(&self, freq: Freq) -> Option<&Bar> {
        self.series.get(&freq).and_then(|xs| xs.last())
    }

    /// 各级别最近K线数量的快照。
    pub fn counts(&self) -> BTreeMap<Freq, usize> {
        self.series.iter().map(|(k, v)| (*k, v.len())).collect()
    }
}
