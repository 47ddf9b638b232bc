//! 合并K线构建（去除包含关系）。
//!
//! 前四根原始K线原样复制以确立初始方向；此后每次更新丢弃最后两根合并
//! K线，再从其后的原始K线重新合并。

use crate::bar::{Bar, MergedBar};
use crate::constant::{Const, Direction};
use crate::utils::tail;

pub(crate) fn update_merged(merged: &mut Vec<MergedBar>, bars: &[Bar]) {
    if merged.is_empty() {
        for bar in bars.iter().take(4) {
            merged.push(MergedBar::from(bar));
        }
    }

    // 新K线只会影响最后两根合并K线
    merged.truncate(merged.len().saturating_sub(2));
    let Some(last) = merged.last() else {
        return;
    };

    let window = if merged.len() <= 4 {
        bars
    } else {
        tail(bars, Const::MERGE_LOOKBACK)
    };
    let last_dt = last.dt;
    let right: Vec<&Bar> = window.iter().filter(|x| x.dt > last_dt).collect();

    for k in right {
        debug_assert!(merged.len() >= 2, "merged series lost its direction context");
        let last = &merged[merged.len() - 1];
        let prev = &merged[merged.len() - 2];
        let direction = if last.high > prev.high {
            Direction::Up
        } else {
            Direction::Down
        };

        let inclusive = (k.high <= last.high && k.low >= last.low)
            || (k.high >= last.high && k.low <= last.low);
        if inclusive {
            let (high, low) = match direction {
                Direction::Up => (last.high.max(k.high), last.low.max(k.low)),
                Direction::Down => (last.high.min(k.high), last.low.min(k.low)),
            };
            // 合并后的开收保持这根K线的红绿极性
            let (open, close) = if k.is_bearish() { (high, low) } else { (low, high) };
            merged.pop();
            merged.push(MergedBar {
                dt: k.dt,
                open,
                high,
                low,
                close,
            });
        } else {
            merged.push(MergedBar::from(k));
        }
    }
}
