//! 走势力度与背驰。
//!
//! 笔口径对区间内 MACD 柱取绝对值求和；线段口径先按走势方向过滤柱的
//! 符号再求和。背驰成立当且仅当近段力度小于前段力度乘以 adjust。

use chrono::{DateTime, Utc};

use crate::bar::Bar;
use crate::constant::{AnalyzeError, Direction, PowerMode};
use crate::indicator::MacdRow;

/// 参与力度比较的一段走势。
#[derive(Debug, Clone, PartialEq)]
pub struct PowerSpan {
    pub start_dt: DateTime<Utc>,
    pub end_dt: DateTime<Utc>,
    pub direction: Direction,
}

impl PowerSpan {
    pub fn new(start_dt: DateTime<Utc>, end_dt: DateTime<Utc>, direction: Direction) -> Self {
        Self {
            start_dt,
            end_dt,
            direction,
        }
    }
}

fn span_rows<'a>(rows: &'a [MacdRow], span: &PowerSpan) -> impl Iterator<Item = &'a MacdRow> {
    let (start, end) = (span.start_dt, span.end_dt);
    rows.iter().filter(move |x| start <= x.dt && x.dt <= end)
}

fn span_power(rows: &[MacdRow], span: &PowerSpan, mode: PowerMode) -> f64 {
    match mode {
        PowerMode::Bi => span_rows(rows, span).map(|x| x.hist.abs()).sum(),
        PowerMode::Xd => match span.direction {
            Direction::Down => span_rows(rows, span)
                .filter(|x| x.hist < 0.0)
                .map(|x| x.hist.abs())
                .sum(),
            Direction::Up => span_rows(rows, span)
                .filter(|x| x.hist > 0.0)
                .map(|x| x.hist.abs())
                .sum(),
        },
    }
}

/// 判断 zs1（近段）对 zs2（前段）是否背驰。
pub fn divergence(
    rows: &[MacdRow],
    zs1: &PowerSpan,
    zs2: &PowerSpan,
    mode: PowerMode,
    adjust: f64,
) -> Result<bool, AnalyzeError> {
    if zs1.start_dt <= zs2.end_dt {
        return Err(AnalyzeError::Precondition(
            "zs1 must be the more recent span".to_string(),
        ));
    }
    if zs1.start_dt >= zs1.end_dt || zs2.start_dt >= zs2.end_dt {
        return Err(AnalyzeError::Precondition(
            "span requires start_dt < end_dt".to_string(),
        ));
    }

    let sum1 = span_power(rows, zs1, mode);
    let sum2 = span_power(rows, zs2, mode);
    Ok(sum1 < sum2 * adjust)
}

/// 用 MACD 柱计算一段走势的力度。
pub fn macd_power(
    rows: &[MacdRow],
    start_dt: DateTime<Utc>,
    end_dt: DateTime<Utc>,
    mode: PowerMode,
    direction: Direction,
) -> f64 {
    span_power(rows, &PowerSpan::new(start_dt, end_dt, direction), mode)
}

/// 用成交量计算一段走势的力度。
pub fn vol_power(bars: &[Bar], start_dt: DateTime<Utc>, end_dt: DateTime<Utc>) -> i64 {
    bars.iter()
        .filter(|x| start_dt <= x.dt && x.dt <= end_dt)
        .map(|x| x.vol)
        .sum::<f64>() as i64
}
