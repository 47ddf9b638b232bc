//! 笔构建。
//!
//! 同极性分型按更极端者移动笔标记；异极性分型要求两分型间至少一根K线
//! 且两分型区间互不包含才新增笔标记。最后一笔被最新K线突破时废弃。

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::bar::{Bar, MergedBar};
use crate::constant::{BiMode, Const, Mark};
use crate::fractal::Fractal;
use crate::utils::tail;

/// 笔标记，由分型晋升而来。
#[derive(Debug, Clone, PartialEq)]
pub struct Stroke {
    pub dt: DateTime<Utc>,
    pub mark: Mark,
    pub value: f64,
    pub start_dt: DateTime<Utc>,
    pub end_dt: DateTime<Utc>,
    pub fx_high: f64,
    pub fx_low: f64,
}

impl From<&Fractal> for Stroke {
    fn from(fx: &Fractal) -> Self {
        Self {
            dt: fx.dt,
            mark: fx.mark,
            value: fx.value,
            start_dt: fx.start_dt,
            end_dt: fx.end_dt,
            fx_high: fx.fx_high,
            fx_low: fx.fx_low,
        }
    }
}

pub(crate) fn update_strokes(
    strokes: &mut Vec<Stroke>,
    fractals: &[Fractal],
    merged: &[MergedBar],
    bars: &[Bar],
    mode: BiMode,
) {
    if fractals.len() < 2 {
        return;
    }

    strokes.truncate(strokes.len().saturating_sub(2));
    if strokes.is_empty() {
        for fx in &fractals[..2] {
            strokes.push(Stroke::from(fx));
        }
    }

    let bootstrapping = strokes.len() <= 2;
    let last_dt = strokes[strokes.len() - 1].dt;

    let fx_window: Vec<&Fractal> = if bootstrapping {
        fractals.iter().filter(|x| x.dt > last_dt).collect()
    } else {
        tail(fractals, Const::BI_FX_LOOKBACK)
            .iter()
            .filter(|x| x.dt > last_dt)
            .collect()
    };

    // 计数用的K线时间轴，口径由 bi_mode 决定
    let bar_dts: Vec<DateTime<Utc>> = match mode {
        BiMode::Old => {
            let source = if bootstrapping {
                merged
            } else {
                tail(merged, Const::BI_BAR_LOOKBACK)
            };
            source
                .iter()
                .filter(|x| x.dt >= last_dt)
                .map(|x| x.dt)
                .collect()
        }
        BiMode::New => {
            let source = if bootstrapping {
                bars
            } else {
                tail(bars, Const::BI_BAR_LOOKBACK)
            };
            source
                .iter()
                .filter(|x| x.dt >= last_dt)
                .map(|x| x.dt)
                .collect()
        }
    };

    for fx in fx_window {
        let last = strokes[strokes.len() - 1].clone();
        if last.mark == fx.mark {
            let relocate = match fx.mark {
                Mark::G => last.value < fx.value,
                Mark::D => last.value > fx.value,
            };
            if relocate {
                debug!(from = %last.dt, to = %fx.dt, "stroke mark relocated");
                let n = strokes.len();
                strokes[n - 1] = Stroke::from(fx);
            }
        } else {
            let inside = bar_dts
                .iter()
                .filter(|dt| last.end_dt < **dt && **dt < fx.start_dt)
                .count();
            if inside == 0 {
                continue;
            }

            // 相邻顶底的分型区间不得存在包含关系
            let separated = match last.mark {
                Mark::G => fx.fx_high < last.fx_high && fx.fx_low < last.fx_low,
                Mark::D => fx.fx_high > last.fx_high && fx.fx_low > last.fx_low,
            };
            if separated {
                debug!(dt = %fx.dt, value = fx.value, "new stroke mark");
                strokes.push(Stroke::from(fx));
            }
        }
    }

    // 最新合并K线越过最后一笔端点时，该笔标记尚不成立
    let broken = match (strokes.last(), merged.last()) {
        (Some(last), Some(latest)) => match last.mark {
            Mark::D => latest.low < last.value,
            Mark::G => latest.high > last.value,
        },
        _ => false,
    };
    if broken {
        debug!("last stroke mark invalidated");
        strokes.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn dt(i: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 7, 1, 9, 30, 0).unwrap() + chrono::Duration::minutes(i)
    }

    fn mk_fx(i: i64, mark: Mark, value: f64, fx_high: f64, fx_low: f64) -> Fractal {
        Fractal {
            dt: dt(i),
            mark,
            value,
            start_dt: dt(i - 1),
            end_dt: dt(i + 1),
            fx_high,
            fx_low,
        }
    }

    fn mk_merged(i: i64, high: f64, low: f64) -> MergedBar {
        MergedBar {
            dt: dt(i),
            open: low,
            high,
            low,
            close: high,
        }
    }

    #[test]
    fn same_polarity_fractal_relocates_the_last_stroke() {
        let fractals = vec![
            mk_fx(1, Mark::G, 12.0, 12.0, 9.0),
            mk_fx(3, Mark::D, 9.0, 11.5, 9.0),
            mk_fx(7, Mark::G, 12.5, 12.5, 10.0),
            mk_fx(9, Mark::G, 13.0, 13.0, 10.5),
        ];
        let merged: Vec<MergedBar> = (0..=10).map(|i| mk_merged(i, 11.0 + (i as f64) * 0.1, 9.0)).collect();

        let mut strokes = Vec::new();
        update_strokes(&mut strokes, &fractals, &merged, &[], BiMode::Old);

        assert_eq!(strokes.len(), 3);
        let last = strokes.last().unwrap();
        assert_eq!(last.mark, Mark::G);
        assert_eq!(last.value, 13.0);
        assert_eq!(last.dt, dt(9));
    }

    #[test]
    fn opposite_fractal_without_interior_bar_is_ignored() {
        let fractals = vec![
            mk_fx(1, Mark::G, 12.0, 12.0, 9.0),
            mk_fx(3, Mark::D, 9.0, 11.5, 9.0),
            // start_dt = dt(4): no merged bar strictly between dt(4) and dt(4)
            mk_fx(5, Mark::G, 12.5, 12.5, 10.0),
        ];
        let merged: Vec<MergedBar> = (0..=6).map(|i| mk_merged(i, 11.0, 9.0)).collect();

        let mut strokes = Vec::new();
        update_strokes(&mut strokes, &fractals, &merged, &[], BiMode::Old);

        assert_eq!(strokes.len(), 2);
        assert_eq!(strokes.last().unwrap().mark, Mark::D);
    }
}
