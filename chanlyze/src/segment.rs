//! 线段构建。
//!
//! 两阶段：先由笔标记的同极性三元组找出潜在线段端点，再用标准特征序列
//! 逐一校验端点是否成立，最后合并同极性端点并剔除被最新笔突破的端点。

use chrono::{DateTime, Utc};
use tracing::debug;

use crate::constant::{Const, Mark};
use crate::stroke::Stroke;
use crate::utils::tail;

/// 线段端点（也是中枢识别的输入单元），只保留时间、极性与端点价。
#[derive(Debug, Clone, PartialEq)]
pub struct Endpoint {
    pub dt: DateTime<Utc>,
    pub mark: Mark,
    pub value: f64,
}

impl From<&Stroke> for Endpoint {
    fn from(stroke: &Stroke) -> Self {
        Self {
            dt: stroke.dt,
            mark: stroke.mark,
            value: stroke.value,
        }
    }
}

/// 标准特征序列中的一个区间。
#[derive(Debug, Clone, PartialEq)]
pub struct StdInterval {
    pub start_dt: DateTime<Utc>,
    pub end_dt: DateTime<Utc>,
    pub high: f64,
    pub low: f64,
}

/// 计算一段笔序列的标准特征序列：奇数下标起取相邻两笔为区间，再按
/// 序列方向合并存在包含关系的相邻区间。
pub fn standard_sequence(seq: &[Endpoint]) -> Vec<StdInterval> {
    if seq.is_empty() {
        return Vec::new();
    }
    // 首笔为底则该段向上，向上合并取 max；向下取 min
    let upward = seq[0].mark == Mark::D;

    let mut raw = Vec::new();
    let mut i = 1;
    while i + 1 < seq.len() {
        raw.push(StdInterval {
            start_dt: seq[i].dt,
            end_dt: seq[i + 1].dt,
            high: seq[i].value.max(seq[i + 1].value),
            low: seq[i].value.min(seq[i + 1].value),
        });
        i += 2;
    }

    let mut out: Vec<StdInterval> = Vec::new();
    for row in raw {
        if out.is_empty() {
            out.push(row);
            continue;
        }
        let last = &out[out.len() - 1];
        let inclusive = (row.high <= last.high && row.low >= last.low)
            || (row.high >= last.high && row.low <= last.low);
        if inclusive {
            let last = out.pop().expect("checked non-empty");
            let (high, low) = if upward {
                (last.high.max(row.high), last.low.max(row.low))
            } else {
                (last.high.min(row.high), last.low.min(row.low))
            };
            out.push(StdInterval {
                start_dt: last.start_dt,
                end_dt: row.end_dt,
                high,
                low,
            });
        } else {
            out.push(row);
        }
    }
    out
}

/// 校验第二个线段端点是否成立。
///
/// `bi_seq1`/`bi_seq2` 为前两个端点区间内的笔序列，`bi_seq3` 为第三个
/// 端点之后的笔序列；相邻序列共享边界笔。
pub fn is_valid_xd(bi_seq1: &[Endpoint], bi_seq2: &[Endpoint], bi_seq3: &[Endpoint]) -> bool {
    debug_assert!(
        bi_seq2.first().map(|x| x.dt) == bi_seq1.last().map(|x| x.dt)
            && bi_seq3.first().map(|x| x.dt) == bi_seq2.last().map(|x| x.dt),
        "stroke sub-sequences must share boundary marks"
    );

    let std1 = standard_sequence(bi_seq1);
    if std1.is_empty() || bi_seq2.len() < 4 {
        return false;
    }

    let first = &bi_seq2[0];
    let second = bi_seq2[1].value;
    let last_value = bi_seq2[bi_seq2.len() - 1].value;

    match first.mark {
        Mark::D => {
            let floor = std1.iter().map(|x| x.low).fold(f64::INFINITY, f64::min);
            if second >= floor {
                // 回撤未破前段特征序列低点：只要求走势未被收回
                if last_value < second {
                    return false;
                }
            } else {
                let mut extended = bi_seq2.to_vec();
                if bi_seq3.len() > 1 {
                    extended.extend_from_slice(&bi_seq3[1..]);
                }
                let std2 = standard_sequence(&extended);
                if std2.len() < 3 {
                    return false;
                }
                let mut tops = 0;
                for i in 1..std2.len() - 1 {
                    let (b1, b2, b3) = (&std2[i - 1], &std2[i], &std2[i + 1]);
                    if b1.high < b2.high && b2.high > b3.high {
                        tops += 1;
                        // 特征序列顶分型落入底分型区间则端点不成立
                        if b1.low.min(b2.low).min(b3.low) < first.value {
                            return false;
                        }
                    }
                }
                if tops == 0 {
                    return false;
                }
            }
        }
        Mark::G => {
            let ceiling = std1
                .iter()
                .map(|x| x.high)
                .fold(f64::NEG_INFINITY, f64::max);
            if second <= ceiling {
                if last_value > second {
                    return false;
                }
            } else {
                let mut extended = bi_seq2.to_vec();
                if bi_seq3.len() > 1 {
                    extended.extend_from_slice(&bi_seq3[1..]);
                }
                let std2 = standard_sequence(&extended);
                if std2.len() < 3 {
                    return false;
                }
                let mut bottoms = 0;
                for i in 1..std2.len() - 1 {
                    let (b1, b2, b3) = (&std2[i - 1], &std2[i], &std2[i + 1]);
                    if b1.low > b2.low && b2.low < b3.low {
                        bottoms += 1;
                        if b1.high.max(b2.high).max(b3.high) > first.value {
                            return false;
                        }
                    }
                }
                if bottoms == 0 {
                    return false;
                }
            }
        }
    }
    true
}

/// 潜在线段端点：同极性笔标记的局部极值。
fn potential_endpoints(strokes: &[Endpoint]) -> Vec<Endpoint> {
    let ds: Vec<&Endpoint> = strokes.iter().filter(|x| x.mark == Mark::D).collect();
    let gs: Vec<&Endpoint> = strokes.iter().filter(|x| x.mark == Mark::G).collect();

    let mut out: Vec<Endpoint> = Vec::new();
    for i in 1..ds.len().saturating_sub(1) {
        if ds[i - 1].value > ds[i].value && ds[i].value < ds[i + 1].value {
            out.push(ds[i].clone());
        }
    }
    for i in 1..gs.len().saturating_sub(1) {
        if gs[i - 1].value < gs[i].value && gs[i].value > gs[i + 1].value {
            out.push(gs[i].clone());
        }
    }
    out.sort_by_key(|x| x.dt);
    out
}

pub(crate) fn update_segments(segments: &mut Vec<Endpoint>, strokes: &[Stroke]) {
    build_segments(segments, strokes);
    validate_segments(segments, strokes);
}

fn build_segments(segments: &mut Vec<Endpoint>, strokes: &[Stroke]) {
    if strokes.len() < 4 {
        return;
    }

    segments.truncate(segments.len().saturating_sub(2));
    if segments.is_empty() {
        for stroke in &strokes[..3] {
            segments.push(Endpoint::from(stroke));
        }
    }

    let last_dt = segments[segments.len() - 1].dt;
    let window: Vec<Endpoint> = if segments.len() <= 3 {
        strokes
            .iter()
            .filter(|x| x.dt >= last_dt)
            .map(Endpoint::from)
            .collect()
    } else {
        tail(strokes, Const::XD_BI_LOOKBACK)
            .iter()
            .filter(|x| x.dt >= last_dt)
            .map(Endpoint::from)
            .collect()
    };

    for cand in potential_endpoints(&window) {
        let last = segments[segments.len() - 1].clone();
        if last.mark == cand.mark {
            let relocate = match cand.mark {
                Mark::D => last.value > cand.value,
                Mark::G => last.value < cand.value,
            };
            if relocate {
                debug!(from = %last.dt, to = %cand.dt, "segment mark relocated");
                let n = segments.len();
                segments[n - 1] = cand;
            }
        } else {
            let degenerate = match last.mark {
                Mark::D => last.value > cand.value,
                Mark::G => last.value < cand.value,
            };
            if degenerate {
                continue;
            }
            let inside = window
                .iter()
                .filter(|x| last.dt <= x.dt && x.dt <= cand.dt)
                .count();
            if inside < 4 {
                debug!(from = %last.dt, to = %cand.dt, "fewer than 4 strokes in span, skipped");
                continue;
            }
            segments.push(cand);
        }
    }
}

fn validate_segments(segments: &mut Vec<Endpoint>, strokes: &[Stroke]) {
    if segments.len() <= 4 {
        return;
    }

    let bi: Vec<Endpoint> = strokes.iter().map(Endpoint::from).collect();
    let between = |a: DateTime<Utc>, b: DateTime<Utc>| -> Vec<Endpoint> {
        bi.iter()
            .filter(|x| a <= x.dt && x.dt <= b)
            .cloned()
            .collect()
    };

    let mut keep: Vec<usize> = Vec::new();
    for i in 1..segments.len() - 2 {
        let (xd1, xd2, xd3, xd4) = (
            &segments[i - 1],
            &segments[i],
            &segments[i + 1],
            &segments[i + 2],
        );
        let seq1 = between(xd1.dt, xd2.dt);
        let seq2 = between(xd2.dt, xd3.dt);
        let seq3 = between(xd3.dt, xd4.dt);
        if seq1.is_empty() || seq2.is_empty() || seq3.is_empty() {
            continue;
        }
        if is_valid_xd(&seq1, &seq2, &seq3) {
            keep.push(i);
        }
    }

    // 最近一个已确定端点
    let n = segments.len();
    let seq1 = between(segments[n - 3].dt, segments[n - 2].dt);
    let seq2 = between(segments[n - 2].dt, segments[n - 1].dt);
    let seq3: Vec<Endpoint> = bi
        .iter()
        .filter(|x| x.dt >= segments[n - 1].dt)
        .cloned()
        .collect();
    if !(seq1.is_empty() || seq2.is_empty() || seq3.is_empty()) && is_valid_xd(&seq1, &seq2, &seq3)
    {
        keep.push(n - 2);
    }
    // 最近一个未确定端点
    if seq3.len() >= 4 {
        keep.push(n - 1);
    }

    let mut rebuilt: Vec<Endpoint> = Vec::new();
    for j in keep {
        let cand = segments[j].clone();
        match rebuilt.last() {
            None => rebuilt.push(cand),
            Some(last) if last.mark == cand.mark => {
                let relocate = match cand.mark {
                    Mark::D => last.value > cand.value,
                    Mark::G => last.value < cand.value,
                };
                if relocate {
                    let m = rebuilt.len();
                    rebuilt[m - 1] = cand;
                }
            }
            Some(_) => rebuilt.push(cand),
        }
    }
    *segments = rebuilt;

    // 最新笔越过最后一个线段端点时该端点废弃
    let broken = match (segments.last(), strokes.last()) {
        (Some(last_xd), Some(last_bi)) => match last_xd.mark {
            Mark::D => last_bi.value < last_xd.value,
            Mark::G => last_bi.value > last_xd.value,
        },
        _ => false,
    };
    if broken {
        debug!("last segment mark invalidated");
        segments.pop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{DateTime, TimeZone, Utc};

    fn dt(i: i64) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2020, 7, 1, 9, 30, 0).unwrap() + chrono::Duration::minutes(i)
    }

    fn ep(i: i64, mark: Mark, value: f64) -> Endpoint {
        Endpoint {
            dt: dt(i),
            mark,
            value,
        }
    }

    #[test]
    fn standard_sequence_pairs_odd_indices() {
        let seq = vec![
            ep(0, Mark::D, 10.0),
            ep(1, Mark::G, 12.0),
            ep(2, Mark::D, 10.8),
            ep(3, Mark::G, 11.7),
            ep(4, Mark::D, 10.5),
        ];
        let std = standard_sequence(&seq);
        assert_eq!(std.len(), 2);
        assert_eq!(std[0].high, 12.0);
        assert_eq!(std[0].low, 10.8);
        assert_eq!(std[1].high, 11.7);
        assert_eq!(std[1].low, 10.5);
    }

    #[test]
    fn standard_sequence_collapses_inclusion_upward() {
        let seq = vec![
            ep(0, Mark::D, 10.0),
            ep(1, Mark::G, 12.0),
            ep(2, Mark::D, 9.5),
            ep(3, Mark::G, 11.5),
            ep(4, Mark::D, 10.0),
        ];
        let std = standard_sequence(&seq);
        // (12, 9.5) contains (11.5, 10): upward merge takes both maxima
        assert_eq!(std.len(), 1);
        assert_eq!(std[0].high, 12.0);
        assert_eq!(std[0].low, 10.0);
        assert_eq!(std[0].start_dt, dt(1));
        assert_eq!(std[0].end_dt, dt(4));
    }

    #[test]
    fn retrace_above_prior_sequence_low_validates_the_endpoint() {
        // 向下线段结束于底，随后的向上回撤未收回
        let seq1 = vec![
            ep(0, Mark::G, 12.5),
            ep(1, Mark::D, 10.8),
            ep(2, Mark::G, 12.0),
            ep(3, Mark::D, 10.5),
            ep(4, Mark::G, 11.7),
            ep(5, Mark::D, 10.9),
        ];
        let seq2 = vec![
            ep(5, Mark::D, 10.9),
            ep(6, Mark::G, 11.0),
            ep(7, Mark::D, 10.7),
            ep(8, Mark::G, 11.5),
        ];
        let seq3 = vec![ep(8, Mark::G, 11.5), ep(9, Mark::D, 10.9), ep(10, Mark::G, 12.0)];
        assert!(is_valid_xd(&seq1, &seq2, &seq3));

        // 回撤被收回：bi_seq2 终点低于其第二笔
        let mut retraced = seq2.clone();
        retraced[3].value = 10.8;
        let seq3b = vec![ep(8, Mark::G, 10.8), ep(9, Mark::D, 10.2), ep(10, Mark::G, 12.0)];
        assert!(!is_valid_xd(&seq1, &retraced, &seq3b));
    }
}
