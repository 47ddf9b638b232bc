//! 井形态识别。
//!
//! 五段同层走势 12345，其中 234 构成中枢，5 段出井。大井与两类小井的
//! 判别条件见各分支；1 力度最小、5 次之、3 最大的组合不构成井。

use chrono::{DateTime, Utc};

use crate::constant::{AnalyzeError, Direction};

/// 一段可比力度的走势（笔或线段均可）。
#[derive(Debug, Clone, PartialEq)]
pub struct MoveSpan {
    pub start_dt: DateTime<Utc>,
    pub end_dt: DateTime<Utc>,
    pub direction: Direction,
    pub high: f64,
    pub low: f64,
    pub power: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Well {
    None,
    UpBig,
    UpSmall,
    DownBig,
    DownSmall,
}

/// 检查最近五段走势是否构成井。
pub fn check_well(
    fd1: &MoveSpan,
    fd2: &MoveSpan,
    fd3: &MoveSpan,
    fd4: &MoveSpan,
    fd5: &MoveSpan,
) -> Result<Well, AnalyzeError> {
    if !(fd1.direction == fd3.direction && fd3.direction == fd5.direction) {
        return Err(AnalyzeError::Precondition(
            "moves 1/3/5 must share a direction".to_string(),
        ));
    }
    if fd2.direction != fd4.direction {
        return Err(AnalyzeError::Precondition(
            "moves 2/4 must share a direction".to_string(),
        ));
    }

    let zs_g = fd2.high.min(fd3.high).min(fd4.high);
    let zs_d = fd2.low.max(fd3.low).max(fd4.low);

    let mut well = Well::None;
    if zs_d < zs_g {
        match fd1.direction {
            Direction::Up if fd5.high > fd3.high.min(fd1.high) => {
                // 大井：5最高3次之1最低，力度1>3>5
                if fd5.high > fd3.high && fd3.high > fd1.high
                    && fd5.power < fd3.power
                    && fd3.power < fd1.power
                {
                    well = Well::UpBig;
                }
                // 第一种小井：3最高5次之1最低，5力度小于1
                if fd1.high < fd5.high && fd5.high < fd3.high && fd5.power < fd1.power {
                    well = Well::UpSmall;
                }
                // 第二种小井：5最高3次之1最低，力度1>5>3
                if fd5.high > fd3.high && fd3.high > fd1.high
                    && fd1.power > fd5.power
                    && fd5.power > fd3.power
                {
                    well = Well::UpSmall;
                }
            }
            Direction::Down if fd5.low < fd3.low.max(fd1.low) => {
                if fd5.low < fd3.low && fd3.low < fd1.low
                    && fd5.power < fd3.power
                    && fd3.power < fd1.power
                {
                    well = Well::DownBig;
                }
                if fd1.low > fd5.low && fd5.low > fd3.low && fd5.power < fd1.power {
                    well = Well::DownSmall;
                }
                if fd3.low > fd5.low && fd5.low > fd1.low
                    && fd1.power > fd5.power
                    && fd5.power > fd3.power
                {
                    well = Well::DownSmall;
                }
            }
            _ => {}
        }
    }
    Ok(well)
}
