//! 信号表计算。
//!
//! 三张固定键位的信号表（分型/笔/线段），键为分析器名称拼接中文标签。
//! 层级尚未就绪时返回全默认值表，不报错。

use serde_json::{Map, Value, json};

use crate::analyzer::Analyzer;
use crate::constant::{Direction, Mark, PowerMode};
use crate::pivot::find_pivots;
use crate::power::PowerSpan;
use crate::segment::Endpoint;
use crate::utils::tail;

fn prefixed(name: &str, table: Map<String, Value>) -> Map<String, Value> {
    table
        .into_iter()
        .map(|(k, v)| (format!("{name}{k}"), v))
        .collect()
}

/// 分型信号。
pub fn fx_signals(ka: &Analyzer) -> Map<String, Value> {
    let mut s = Map::new();
    for key in [
        "收于MA5上方",
        "收于MA5下方",
        "收于MA20上方",
        "收于MA20下方",
        "收于MA120上方",
        "收于MA120下方",
        "最后一个分型为顶",
        "最后一个分型为底",
        "顶分型后有效跌破MA5",
        "底分型后有效升破MA5",
    ] {
        s.insert(key.to_string(), json!(false));
    }
    s.insert("最近三K线形态".to_string(), Value::Null);

    let merged = ka.merged_bars();
    if merged.len() >= 3 {
        let tri = &merged[merged.len() - 3..];
        let shape = if tri[0].high < tri[1].high && tri[1].high > tri[2].high {
            Some("g")
        } else if tri[0].low > tri[1].low && tri[1].low < tri[2].low {
            Some("d")
        } else if tri[0].low > tri[1].low && tri[1].low > tri[2].low {
            Some("down")
        } else if tri[0].high < tri[1].high && tri[1].high < tri[2].high {
            Some("up")
        } else {
            None
        };
        if let Some(shape) = shape {
            s.insert("最近三K线形态".to_string(), json!(shape));
        }
    }

    let bars = ka.bars();
    let ma = ka.ma_rows();
    if bars.len() < 10 || ma.len() < 10 {
        return prefixed(ka.name(), s);
    }
    let last_bars = &bars[bars.len() - 10..];
    let last_ma = &ma[ma.len() - 10..];
    debug_assert!(
        last_bars
            .iter()
            .zip(last_ma)
            .all(|(bar, row)| bar.dt == row.dt),
        "ma rows out of alignment with raw bars"
    );

    let last_close = last_bars[9].close;
    let ma_at = |i: usize, p: usize| last_ma[i].get(p).unwrap_or(f64::NAN);
    for (period, above, below) in [
        (5usize, "收于MA5上方", "收于MA5下方"),
        (20, "收于MA20上方", "收于MA20下方"),
        (120, "收于MA120上方", "收于MA120下方"),
    ] {
        if last_close >= ma_at(9, period) {
            s.insert(above.to_string(), json!(true));
        } else {
            s.insert(below.to_string(), json!(true));
        }
    }

    let Some(last_fx) = ka.fractals().last() else {
        return prefixed(ka.name(), s);
    };
    let after: Vec<usize> = (0..10).filter(|&i| last_bars[i].dt >= last_fx.dt).collect();

    match last_fx.mark {
        Mark::G => {
            s.insert("最后一个分型为顶".to_string(), json!(true));
            // 有效跌破MA5：分型右侧首根收于MA5下方，或连续5根最低价下穿，
            // 或连续3根收盘价收于下方
            let first_right = after
                .get(1)
                .map(|&i| last_bars[i].close < ma_at(i, 5))
                .unwrap_or(false);
            let five_below = after.len() >= 5
                && tail(&after, 5)
                    .iter()
                    .all(|&i| last_bars[i].low < ma_at(i, 5));
            let three_below = after.len() >= 3
                && tail(&after, 3)
                    .iter()
                    .all(|&i| last_bars[i].close < ma_at(i, 5));
            if first_right || five_below || three_below {
                s.insert("顶分型后有效跌破MA5".to_string(), json!(true));
            }
        }
        Mark::D => {
            s.insert("最后一个分型为底".to_string(), json!(true));
            let first_right = after
                .get(1)
                .map(|&i| last_bars[i].close > ma_at(i, 5))
                .unwrap_or(false);
            let five_above = after.len() >= 5
                && tail(&after, 5)
                    .iter()
                    .all(|&i| last_bars[i].high > ma_at(i, 5));
            let three_above = after.len() >= 3
                && tail(&after, 3)
                    .iter()
                    .all(|&i| last_bars[i].close > ma_at(i, 5));
            if first_right || five_above || three_above {
                s.insert("底分型后有效升破MA5".to_string(), json!(true));
            }
        }
    }

    prefixed(ka.name(), s)
}

/// 笔信号。
pub fn bi_signals(ka: &Analyzer) -> Map<String, Value> {
    let mut s = Map::new();
    for key in [
        "最后一个未确认的笔标记为底",
        "最后一个未确认的笔标记为顶",
        "最后一个已确认的笔标记为底",
        "最后一个已确认的笔标记为顶",
        "向上笔走势延伸",
        "向上笔现顶分型",
        "向下笔走势延伸",
        "向下笔现底分型",
    ] {
        s.insert(key.to_string(), json!(false));
    }
    s.insert("最后一个笔中枢上沿".to_string(), json!(0));
    s.insert("最后一个笔中枢下沿".to_string(), json!(0));
    for key in [
        "收于笔中枢上方且有三买",
        "收于笔中枢上方且无三买",
        "收于笔中枢下方且有三卖",
        "收于笔中枢下方且无三卖",
        "笔同级别分解买",
        "笔同级别分解卖",
        "类趋势顶背驰（笔）",
        "类趋势底背驰（笔）",
        "类盘整顶背驰（笔）",
        "类盘整底背驰（笔）",
    ] {
        s.insert(key.to_string(), json!(false));
    }

    let strokes = ka.strokes();
    let fractals = ka.fractals();
    if strokes.is_empty() || fractals.is_empty() {
        return prefixed(ka.name(), s);
    }

    if strokes.len() > 2 {
        let key = match strokes[strokes.len() - 1].mark {
            Mark::D => "最后一个未确认的笔标记为底",
            Mark::G => "最后一个未确认的笔标记为顶",
        };
        s.insert(key.to_string(), json!(true));
        let key = match strokes[strokes.len() - 2].mark {
            Mark::D => "最后一个已确认的笔标记为底",
            Mark::G => "最后一个已确认的笔标记为顶",
        };
        s.insert(key.to_string(), json!(true));
    }

    let last_bi = &strokes[strokes.len() - 1];
    let last_fx = &fractals[fractals.len() - 1];
    let key = match (last_bi.mark, last_fx.mark) {
        (Mark::D, Mark::D) => "向上笔走势延伸",
        (Mark::D, Mark::G) => "向上笔现顶分型",
        (Mark::G, Mark::G) => "向下笔走势延伸",
        (Mark::G, Mark::D) => "向下笔现底分型",
    };
    s.insert(key.to_string(), json!(true));

    let bis = tail(strokes, 30);
    let mut range_bottom_divergence = false;
    let mut range_top_divergence = false;
    if bis.len() >= 6 {
        let n = bis.len();
        if bis[n - 1].mark == Mark::D
            && bis[n - 1].value < bis[n - 3].value
            && bis[n - 2].value < bis[n - 4].value
        {
            let zs1 = PowerSpan::new(bis[n - 2].dt, bis[n - 1].dt, Direction::Down);
            let zs2 = PowerSpan::new(bis[n - 4].dt, bis[n - 3].dt, Direction::Down);
            if ka
                .is_bei_chi(&zs1, &zs2, PowerMode::Bi, 0.9, None)
                .unwrap_or(false)
            {
                if bis[n - 2].value < bis[n - 5].value {
                    s.insert("类趋势底背驰（笔）".to_string(), json!(true));
                } else {
                    range_bottom_divergence = true;
                    s.insert("类盘整底背驰（笔）".to_string(), json!(true));
                }
            }
        }

        if bis[n - 1].mark == Mark::G
            && bis[n - 1].value > bis[n - 3].value
            && bis[n - 2].value > bis[n - 4].value
        {
            let zs1 = PowerSpan::new(bis[n - 2].dt, bis[n - 1].dt, Direction::Up);
            let zs2 = PowerSpan::new(bis[n - 4].dt, bis[n - 3].dt, Direction::Up);
            if ka
                .is_bei_chi(&zs1, &zs2, PowerMode::Bi, 0.9, None)
                .unwrap_or(false)
            {
                if bis[n - 2].value > bis[n - 5].value {
                    s.insert("类趋势顶背驰（笔）".to_string(), json!(true));
                } else {
                    range_top_divergence = true;
                    s.insert("类盘整顶背驰（笔）".to_string(), json!(true));
                }
            }
        }
    }

    let points: Vec<Endpoint> = bis.iter().map(Endpoint::from).collect();
    let pivots = find_pivots(&points);
    if let Some(last_zs) = pivots.last() {
        s.insert("最后一个笔中枢上沿".to_string(), json!(last_zs.zg));
        s.insert("最后一个笔中枢下沿".to_string(), json!(last_zs.zd));

        if let Some(last_k) = ka.merged_bars().last() {
            if last_k.close > last_zs.zg {
                let key = if last_zs.third_buy.is_some() {
                    "收于笔中枢上方且有三买"
                } else {
                    "收于笔中枢上方且无三买"
                };
                s.insert(key.to_string(), json!(true));
            }
            if last_k.close < last_zs.zd {
                let key = if last_zs.third_sell.is_some() {
                    "收于笔中枢下方且有三卖"
                } else {
                    "收于笔中枢下方且无三卖"
                };
                s.insert(key.to_string(), json!(true));
            }
        }
    }

    if bis.len() >= 6 {
        let n = bis.len();
        if bis[n - 1].mark == Mark::D
            && bis[n - 2].value > bis[n - 5].value
            && (bis[n - 1].value > bis[n - 3].value || range_bottom_divergence)
        {
            s.insert("笔同级别分解买".to_string(), json!(true));
        }
        if bis[n - 1].mark == Mark::G
            && bis[n - 2].value < bis[n - 5].value
            && (bis[n - 1].value < bis[n - 3].value || range_top_divergence)
        {
            s.insert("笔同级别分解卖".to_string(), json!(true));
        }
    }

    prefixed(ka.name(), s)
}

/// 线段信号。
pub fn xd_signals(ka: &Analyzer) -> Map<String, Value> {
    let mut s = Map::new();
    for key in [
        "最后一个未确认的线段标记为底",
        "最后一个未确认的线段标记为顶",
        "最后一个已确认的线段标记为底",
        "最后一个已确认的线段标记为顶",
    ] {
        s.insert(key.to_string(), json!(false));
    }
    s.insert("最后一个线段内部笔标记数量".to_string(), json!(0));
    s.insert("最近上一线段内部笔标记数量".to_string(), json!(0));
    for key in [
        "类趋势顶背驰（段）",
        "类趋势底背驰（段）",
        "类盘整顶背驰（段）",
        "类盘整底背驰（段）",
        "同级别分解买",
        "同级别分解卖",
    ] {
        s.insert(key.to_string(), json!(false));
    }

    let segments = ka.segments();
    let strokes = ka.strokes();
    if segments.len() < 2 {
        return prefixed(ka.name(), s);
    }

    let key = match segments[segments.len() - 1].mark {
        Mark::D => "最后一个未确认的线段标记为底",
        Mark::G => "最后一个未确认的线段标记为顶",
    };
    s.insert(key.to_string(), json!(true));
    let key = match segments[segments.len() - 2].mark {
        Mark::D => "最后一个已确认的线段标记为底",
        Mark::G => "最后一个已确认的线段标记为顶",
    };
    s.insert(key.to_string(), json!(true));

    let last_xd = &segments[segments.len() - 1];
    let prev_xd = &segments[segments.len() - 2];
    let inside_count = tail(strokes, 60)
        .iter()
        .filter(|x| x.dt >= last_xd.dt)
        .count();
    s.insert("最后一个线段内部笔标记数量".to_string(), json!(inside_count));
    let prev_count = tail(strokes, 100)
        .iter()
        .filter(|x| prev_xd.dt <= x.dt && x.dt <= last_xd.dt)
        .count();
    s.insert("最近上一线段内部笔标记数量".to_string(), json!(prev_count));

    let xds = tail(segments, 50);
    let mut range_bottom_divergence = false;
    let mut range_top_divergence = false;
    if xds.len() >= 6 {
        let n = xds.len();
        if xds[n - 1].mark == Mark::D
            && xds[n - 1].value < xds[n - 3].value
            && xds[n - 2].value < xds[n - 4].value
        {
            let zs1 = PowerSpan::new(xds[n - 2].dt, xds[n - 1].dt, Direction::Down);
            let zs2 = PowerSpan::new(xds[n - 4].dt, xds[n - 3].dt, Direction::Down);
            if ka
                .is_bei_chi(&zs1, &zs2, PowerMode::Xd, 0.9, None)
                .unwrap_or(false)
            {
                if xds[n - 2].value < xds[n - 5].value {
                    s.insert("类趋势底背驰（段）".to_string(), json!(true));
                } else {
                    range_bottom_divergence = true;
                    s.insert("类盘整底背驰（段）".to_string(), json!(true));
                }
            }
        }

        if xds[n - 1].mark == Mark::G
            && xds[n - 1].value > xds[n - 3].value
            && xds[n - 2].value > xds[n - 4].value
        {
            let zs1 = PowerSpan::new(xds[n - 2].dt, xds[n - 1].dt, Direction::Up);
            let zs2 = PowerSpan::new(xds[n - 4].dt, xds[n - 3].dt, Direction::Up);
            if ka
                .is_bei_chi(&zs1, &zs2, PowerMode::Xd, 0.9, None)
                .unwrap_or(false)
            {
                if xds[n - 2].value > xds[n - 5].value {
                    s.insert("类趋势顶背驰（段）".to_string(), json!(true));
                } else {
                    range_top_divergence = true;
                    s.insert("类盘整顶背驰（段）".to_string(), json!(true));
                }
            }
        }
    }

    let n = xds.len();
    if n >= 6 && inside_count >= 6 {
        if xds[n - 1].mark == Mark::G
            && xds[n - 2].value < xds[n - 5].value
            && (xds[n - 1].value < xds[n - 3].value || range_bottom_divergence)
        {
            s.insert("同级别分解买".to_string(), json!(true));
        }
        if xds[n - 1].mark == Mark::D
            && xds[n - 2].value > xds[n - 5].value
            && (xds[n - 1].value > xds[n - 3].value || range_top_divergence)
        {
            s.insert("同级别分解卖".to_string(), json!(true));
        }
    }

    prefixed(ka.name(), s)
}
