//! K线输入。
//!
//! 外部行情采集不在本 crate 范围内；这里只提供标准化的 CSV 读入，
//! 供回放与测试使用。

use std::path::Path;

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::Deserialize;

use crate::bar::Bar;
use crate::constant::AnalyzeError;

#[derive(Debug, Deserialize)]
struct CsvBarRow {
    #[serde(alias = "datetime")]
    dt: String,
    open: f64,
    high: f64,
    low: f64,
    close: f64,
    #[serde(default, alias = "volume")]
    vol: f64,
}

/// 从 CSV 读入某一标的的K线序列，列名 `dt/open/high/low/close/vol`
/// （兼容 `datetime`、`volume` 别名）。
pub fn load_bars_csv(
    file_path: impl AsRef<Path>,
    symbol: impl Into<String>,
) -> Result<Vec<Bar>, AnalyzeError> {
    let symbol = symbol.into();
    let mut reader = csv::Reader::from_path(file_path)?;
    let mut out = Vec::new();
    for row in reader.deserialize::<CsvBarRow>() {
        let row = row?;
        out.push(Bar {
            symbol: symbol.clone(),
            dt: parse_datetime(&row.dt)?,
            open: row.open,
            high: row.high,
            low: row.low,
            close: row.close,
            vol: row.vol,
        });
    }
    Ok(out)
}

pub fn parse_datetime(value: &str) -> Result<DateTime<Utc>, AnalyzeError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Ok(dt.with_timezone(&Utc));
    }

    let patterns = [
        "%Y-%m-%d %H:%M:%S%.f",
        "%Y/%m/%d %H:%M:%S%.f",
        "%Y%m%d%H%M%S%.f",
    ];
    for pattern in patterns {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, pattern) {
            return Ok(DateTime::<Utc>::from_naive_utc_and_offset(dt, Utc));
        }
    }
    Err(AnalyzeError::InvalidDatetime(value.to_string()))
}
