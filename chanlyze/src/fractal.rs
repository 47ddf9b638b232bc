//! 分型识别。
//!
//! 三根相邻合并K线构成顶/底分型；与中间K线存在缺口的一侧不计入分型
//! 区间。每次更新丢弃最后一个分型并从其位置重新扫描。

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::bar::MergedBar;
use crate::constant::{Const, Mark};
use crate::utils::tail;

#[derive(Debug, Clone, PartialEq)]
pub struct Fractal {
    pub dt: DateTime<Utc>,
    pub mark: Mark,
    pub value: f64,
    pub start_dt: DateTime<Utc>,
    pub end_dt: DateTime<Utc>,
    pub fx_high: f64,
    pub fx_low: f64,
}

/// 两根K线之间是否存在缺口，`b` 必须晚于 `a`。
pub fn has_gap(a: &MergedBar, b: &MergedBar) -> bool {
    debug_assert!(b.dt > a.dt);
    a.high < b.low * (1.0 - Const::MIN_GAP) || b.high < a.low * (1.0 - Const::MIN_GAP)
}

pub(crate) fn update_fractals(fractals: &mut Vec<Fractal>, merged: &[MergedBar]) {
    if merged.len() < 3 {
        return;
    }

    fractals.truncate(fractals.len().saturating_sub(1));
    let window: Vec<&MergedBar> = match fractals.last() {
        None => merged.iter().collect(),
        Some(last) => tail(merged, Const::FX_LOOKBACK)
            .iter()
            .filter(|x| x.dt >= last.dt)
            .collect(),
    };

    let mut i = 1;
    while i + 1 < window.len() {
        let (k1, k2, k3) = (window[i - 1], window[i], window[i + 1]);
        let mut elements = vec![k1, k2, k3];
        if has_gap(k1, k2) {
            elements.remove(0);
        }
        if has_gap(k2, k3) {
            elements.pop();
        }

        if k1.high < k2.high && k2.high > k3.high {
            debug!(dt = %k2.dt, value = k2.high, "top fractal");
            fractals.push(Fractal {
                dt: k2.dt,
                mark: Mark::G,
                value: k2.high,
                start_dt: k1.dt,
                end_dt: k3.dt,
                fx_high: k2.high,
                fx_low: elements.iter().map(|x| x.low).fold(f64::INFINITY, f64::min),
            });
        } else if k1.low > k2.low && k2.low < k3.low {
            debug!(dt = %k2.dt, value = k2.low, "bottom fractal");
            fractals.push(Fractal {
                dt: k2.dt,
                mark: Mark::D,
                value: k2.low,
                start_dt: k1.dt,
                end_dt: k3.dt,
                fx_high: elements.iter().map(|x| x.high).fold(f64::NEG_INFINITY, f64::max),
                fx_low: k2.low,
            });
        }
        i += 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn mk_merged(i: i64, high: f64, low: f64) -> MergedBar {
        let dt = Utc.with_ymd_and_hms(2020, 7, 1, 9, 30, 0).unwrap() + chrono::Duration::minutes(i);
        MergedBar {
            dt,
            open: low,
            high,
            low,
            close: high,
        }
    }

    #[test]
    fn gap_side_is_excluded_from_the_fractal_range() {
        // 10 < 11 * 0.998 -> k1/k2 gap, k1 excluded
        let k1 = mk_merged(0, 10.0, 9.0);
        let k2 = mk_merged(1, 12.0, 11.0);
        let k3 = mk_merged(2, 11.0, 10.5);
        assert!(has_gap(&k1, &k2));
        assert!(!has_gap(&k2, &k3));

        let mut fractals = Vec::new();
        update_fractals(&mut fractals, &[k1.clone(), k2.clone(), k3.clone()]);

        assert_eq!(fractals.len(), 1);
        let fx = &fractals[0];
        assert_eq!(fx.mark, Mark::G);
        assert_eq!(fx.value, 12.0);
        assert_eq!(fx.dt, k2.dt);
        assert_eq!(fx.start_dt, k1.dt);
        assert_eq!(fx.end_dt, k3.dt);
        assert_eq!(fx.fx_high, 12.0);
        assert_eq!(fx.fx_low, 10.5);
    }

    #[test]
    fn bottom_fractal_spans_all_three_bars_without_gap() {
        let k1 = mk_merged(0, 12.0, 11.0);
        let k2 = mk_merged(1, 11.5, 10.2);
        let k3 = mk_merged(2, 12.5, 10.8);

        let mut fractals = Vec::new();
        update_fractals(&mut fractals, &[k1, k2, k3]);

        assert_eq!(fractals.len(), 1);
        let fx = &fractals[0];
        assert_eq!(fx.mark, Mark::D);
        assert_eq!(fx.value, 10.2);
        assert_eq!(fx.fx_high, 12.5);
        assert_eq!(fx.fx_low, 10.2);
    }
}
