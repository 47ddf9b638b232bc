use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// 原始K线，`dt` 为该K线的收盘时间。
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub symbol: String,
    pub dt: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub vol: f64,
}

impl Bar {
    pub fn body(&self) -> f64 {
        (self.close - self.open).abs()
    }

    pub fn is_bearish(&self) -> bool {
        self.open >= self.close
    }
}

/// 去除包含关系后的合并K线。
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MergedBar {
    pub dt: DateTime<Utc>,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
}

impl MergedBar {
    pub fn is_inclusive(&self, other: &Self) -> bool {
        (self.high >= other.high && self.low <= other.low)
            || (self.high <= other.high && self.low >= other.low)
    }
}

impl From<&Bar> for MergedBar {
    fn from(bar: &Bar) -> Self {
        Self {
            dt: bar.dt,
            open: bar.open,
            high: bar.high,
            low: bar.low,
            close: bar.close,
        }
    }
}
