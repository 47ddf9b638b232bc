//! 中枢识别。
//!
//! 对笔或线段端点做滑窗扫描：窗口前四个端点给出 [ZD, ZG] 区间，端点
//! 在区间上/下方结束时构成三买/三卖并关闭中枢；扫描结束仍然成立的
//! 窗口输出未关闭中枢。

use chrono::{DateTime, Utc};

use crate::constant::{Direction, Mark};
use crate::segment::Endpoint;

/// 与中枢方向一致的次级别 Z 走势段。
#[derive(Debug, Clone, PartialEq)]
pub struct ZSegment {
    pub start_dt: DateTime<Utc>,
    pub end_dt: DateTime<Utc>,
    pub high: f64,
    pub low: f64,
    pub direction: Direction,
    pub mid: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Pivot {
    pub zg: f64,
    pub zd: f64,
    pub g: f64,
    pub gg: f64,
    pub d: f64,
    pub dd: f64,
    pub start_point: Endpoint,
    pub end_point: Option<Endpoint>,
    pub points: Vec<Endpoint>,
    pub zn: Vec<ZSegment>,
    pub third_buy: Option<Endpoint>,
    pub third_sell: Option<Endpoint>,
}

fn bound(points: &[Endpoint], mark: Mark, take_max: bool) -> Option<f64> {
    points
        .iter()
        .filter(|x| x.mark == mark)
        .map(|x| x.value)
        .fold(None, |acc: Option<f64>, v| {
            Some(match acc {
                None => v,
                Some(a) => {
                    if take_max {
                        a.max(v)
                    } else {
                        a.min(v)
                    }
                }
            })
        })
}

fn z_segments(points: &[Endpoint]) -> Vec<ZSegment> {
    let points = if points.len() % 2 != 0 {
        &points[..points.len() - 1]
    } else {
        points
    };
    let Some(first) = points.first() else {
        return Vec::new();
    };
    let direction = match first.mark {
        Mark::D => Direction::Up,
        Mark::G => Direction::Down,
    };

    let mut out = Vec::new();
    let mut i = 0;
    while i + 1 < points.len() {
        let high = points[i].value.max(points[i + 1].value);
        let low = points[i].value.min(points[i + 1].value);
        out.push(ZSegment {
            start_dt: points[i].dt,
            end_dt: points[i + 1].dt,
            high,
            low,
            direction,
            mid: low + (high - low) / 2.0,
        });
        i += 2;
    }
    out
}

fn close_pivot(
    window: &[Endpoint],
    zd: f64,
    zg: f64,
    third_buy: Option<Endpoint>,
    third_sell: Option<Endpoint>,
    open_ended: bool,
) -> Option<Pivot> {
    let g = bound(window, Mark::G, false)?;
    let gg = bound(window, Mark::G, true)?;
    let d = bound(window, Mark::D, true)?;
    let dd = bound(window, Mark::D, false)?;
    Some(Pivot {
        zg,
        zd,
        g,
        gg,
        d,
        dd,
        start_point: window[1].clone(),
        end_point: if open_ended {
            None
        } else {
            Some(window[window.len() - 2].clone())
        },
        points: window.to_vec(),
        zn: z_segments(&window[3..]),
        third_buy,
        third_sell,
    })
}

/// 在端点序列上识别所有中枢。
pub fn find_pivots(points: &[Endpoint]) -> Vec<Pivot> {
    if points.len() < 5 {
        return Vec::new();
    }

    let mut pivots = Vec::new();
    let mut window: Vec<Endpoint> = Vec::new();

    for point in points {
        if window.len() < 5 {
            window.push(point.clone());
            continue;
        }

        let (Some(zd), Some(zg)) = (bound(&window[..4], Mark::D, true), bound(&window[..4], Mark::G, false))
        else {
            window.push(point.clone());
            window.remove(0);
            continue;
        };
        if zg <= zd {
            window.push(point.clone());
            window.remove(0);
            continue;
        }

        if point.mark == Mark::D && point.value > zg {
            // 线段在中枢上方结束，三买
            if let Some(pivot) = close_pivot(&window, zd, zg, Some(point.clone()), None, false) {
                pivots.push(pivot);
            }
            window.clear();
        } else if point.mark == Mark::G && point.value < zd {
            // 线段在中枢下方结束，三卖
            if let Some(pivot) = close_pivot(&window, zd, zg, None, Some(point.clone()), false) {
                pivots.push(pivot);
            }
            window.clear();
        } else {
            window.push(point.clone());
        }
    }

    if window.len() >= 5 {
        if let (Some(zd), Some(zg)) = (
            bound(&window[..4], Mark::D, true),
            bound(&window[..4], Mark::G, false),
        ) {
            if zg > zd {
                if let Some(pivot) = close_pivot(&window, zd, zg, None, None, true) {
                    pivots.push(pivot);
                }
            }
        }
    }
    pivots
}
