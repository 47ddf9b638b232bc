//! 技术指标缓存。
//!
//! 与原始K线逐行对齐的 SMA 与 MACD 序列：初始化时整体重算，增量时只补
//! 最后一行（新K线追加一行，未完成K线覆盖最后一行）。

use chrono::{DateTime, Utc};

use crate::bar::Bar;
use crate::constant::{AnalyzeError, Const};
use crate::utils::tail;

use super::macd::macd;
use super::sma::sma;

const MACD_FAST: usize = 12;
const MACD_SLOW: usize = 26;
const MACD_SIGNAL: usize = 9;

/// 单根K线上的均线值，`values` 与均线参数一一对应。
#[derive(Debug, Clone, PartialEq)]
pub struct MaRow {
    pub dt: DateTime<Utc>,
    pub values: Vec<(usize, f64)>,
}

impl MaRow {
    pub fn get(&self, period: usize) -> Option<f64> {
        self.values
            .iter()
            .find(|(p, _)| *p == period)
            .map(|(_, v)| *v)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MacdRow {
    pub dt: DateTime<Utc>,
    pub diff: f64,
    pub dea: f64,
    pub hist: f64,
}

#[derive(Debug, Clone)]
pub struct IndicatorCache {
    params: Vec<usize>,
    ma: Vec<MaRow>,
    macd: Vec<MacdRow>,
}

impl IndicatorCache {
    pub fn new(params: Vec<usize>) -> Self {
        Self {
            params,
            ma: Vec::new(),
            macd: Vec::new(),
        }
    }

    pub fn params(&self) -> &[usize] {
        &self.params
    }

    pub fn ma_rows(&self) -> &[MaRow] {
        &self.ma
    }

    pub fn macd_rows(&self) -> &[MacdRow] {
        &self.macd
    }

    /// 追加或覆盖最后一行，保持与 `bars` 对齐。
    pub(crate) fn update(&mut self, bars: &[Bar]) -> Result<(), AnalyzeError> {
        if self.ma.is_empty() {
            self.rebuild_ma(bars);
        } else {
            let closes: Vec<f64> = bars.iter().map(|x| x.close).collect();
            let row = MaRow {
                dt: bars[bars.len() - 1].dt,
                values: self
                    .params
                    .iter()
                    .map(|&p| (p, tail(&closes, p).iter().sum::<f64>() / p as f64))
                    .collect(),
            };
            self.push_or_replace_ma(bars, row);
        }
        self.check_settled(bars, self.ma[self.ma.len() - 2].dt, "ma")?;

        if self.macd.is_empty() {
            self.rebuild_macd(bars);
        } else {
            let closes: Vec<f64> = tail(bars, Const::MACD_TAIL).iter().map(|x| x.close).collect();
            let (diff, dea, hist) = macd(&closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL);
            let last = closes.len() - 1;
            let row = MacdRow {
                dt: bars[bars.len() - 1].dt,
                diff: diff[last],
                dea: dea[last],
                hist: hist[last],
            };
            self.push_or_replace_macd(bars, row);
        }
        self.check_settled(bars, self.macd[self.macd.len() - 2].dt, "macd")?;
        Ok(())
    }

    pub(crate) fn trim(&mut self, keep: usize) {
        if self.ma.len() > keep {
            self.ma.drain(..self.ma.len() - keep);
        }
        if self.macd.len() > keep {
            self.macd.drain(..self.macd.len() - keep);
        }
    }

    fn rebuild_ma(&mut self, bars: &[Bar]) {
        let closes: Vec<f64> = bars.iter().map(|x| x.close).collect();
        let tables: Vec<(usize, Vec<f64>)> = self
            .params
            .iter()
            .map(|&p| (p, sma(&closes, p)))
            .collect();
        self.ma = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| MaRow {
                dt: bar.dt,
                values: tables.iter().map(|(p, col)| (*p, col[i])).collect(),
            })
            .collect();
    }

    fn rebuild_macd(&mut self, bars: &[Bar]) {
        let closes: Vec<f64> = bars.iter().map(|x| x.close).collect();
        let (diff, dea, hist) = macd(&closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL);
        self.macd = bars
            .iter()
            .enumerate()
            .map(|(i, bar)| MacdRow {
                dt: bar.dt,
                diff: diff[i],
                dea: dea[i],
                hist: hist[i],
            })
            .collect();
    }

    fn push_or_replace_ma(&mut self, bars: &[Bar], row: MaRow) {
        let settled = bars[bars.len() - 2].dt;
        if settled == self.ma[self.ma.len() - 1].dt {
            self.ma.push(row);
        } else {
            let last = self.ma.len() - 1;
            self.ma[last] = row;
        }
    }

    fn push_or_replace_macd(&mut self, bars: &[Bar], row: MacdRow) {
        let settled = bars[bars.len() - 2].dt;
        if settled == self.macd[self.macd.len() - 1].dt {
            self.macd.push(row);
        } else {
            let last = self.macd.len() - 1;
            self.macd[last] = row;
        }
    }

    fn check_settled(
        &self,
        bars: &[Bar],
        row_dt: DateTime<Utc>,
        table: &str,
    ) -> Result<(), AnalyzeError> {
        let settled = bars[bars.len() - 2].dt;
        if row_dt != settled {
            return Err(AnalyzeError::Structural(format!(
                "{table} second-to-last row dt {row_dt} != settled bar dt {settled}"
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn mk_bar(i: i64, close: f64) -> Bar {
        let dt = Utc.with_ymd_and_hms(2020, 7, 1, 9, 30, 0).unwrap() + chrono::Duration::minutes(i);
        Bar {
            symbol: "T".to_string(),
            dt,
            open: close - 0.5,
            high: close + 1.0,
            low: close - 1.0,
            close,
            vol: 100.0,
        }
    }

    #[test]
    fn appends_on_new_bar_and_replaces_in_progress_row() {
        let mut bars: Vec<Bar> = (0..10).map(|i| mk_bar(i, 100.0 + i as f64)).collect();
        let mut cache = IndicatorCache::new(vec![5]);
        cache.update(&bars).unwrap();
        assert_eq!(cache.ma_rows().len(), bars.len());

        // new bar -> one more row
        bars.push(mk_bar(10, 111.0));
        cache.update(&bars).unwrap();
        assert_eq!(cache.ma_rows().len(), bars.len());

        // in-progress rewrite of the last bar -> same row count, new value
        let n = bars.len();
        bars[n - 1].close = 112.0;
        cache.update(&bars).unwrap();
        assert_eq!(cache.ma_rows().len(), bars.len());
        let last = cache.ma_rows().last().unwrap();
        let expected = bars[n - 5..].iter().map(|x| x.close).sum::<f64>() / 5.0;
        assert!((last.get(5).unwrap() - expected).abs() < 1e-9);
    }
}
