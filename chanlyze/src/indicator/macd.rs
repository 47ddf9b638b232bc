/// Exponential moving average seeded with a plain average over the first
/// full window, as the classic TA libraries do. Leading NaN values in the
/// input are skipped so the function composes with itself (MACD signal
/// line over a partially-warm diff sequence).
pub fn ema(values: &[f64], period: usize) -> Vec<f64> {
    assert!(period > 0, "period must be > 0");
    let mut out = vec![f64::NAN; values.len()];
    let Some(first) = values.iter().position(|x| x.is_finite()) else {
        return out;
    };
    let seed_idx = first + period - 1;
    if seed_idx >= values.len() {
        return out;
    }

    let seed = values[first..=seed_idx].iter().sum::<f64>() / period as f64;
    out[seed_idx] = seed;

    let alpha = 2.0 / (period as f64 + 1.0);
    let mut prev = seed;
    for i in (seed_idx + 1)..values.len() {
        prev += alpha * (values[i] - prev);
        out[i] = prev;
    }
    out
}

/// MACD over a closing-price sequence: returns `(diff, dea, hist)` with
/// `diff = ema(fast) - ema(slow)`, `dea = ema(diff, signal)` and
/// `hist = diff - dea`.
pub fn macd(values: &[f64], fast: usize, slow: usize, signal: usize) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
    let ema_fast = ema(values, fast);
    let ema_slow = ema(values, slow);
    let diff: Vec<f64> = ema_fast
        .iter()
        .zip(&ema_slow)
        .map(|(a, b)| a - b)
        .collect();
    let dea = ema(&diff, signal);
    let hist: Vec<f64> = diff.iter().zip(&dea).map(|(a, b)| a - b).collect();
    (diff, dea, hist)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ema_seeds_with_window_average() {
        let out = ema(&[2.0, 4.0, 6.0, 8.0], 3);
        assert!(out[0].is_nan());
        assert!(out[1].is_nan());
        assert!((out[2] - 4.0).abs() < 1e-9);
        // alpha = 0.5: 4.0 + 0.5 * (8.0 - 4.0)
        assert!((out[3] - 6.0).abs() < 1e-9);
    }

    #[test]
    fn ema_skips_leading_nan() {
        let out = ema(&[f64::NAN, f64::NAN, 2.0, 4.0, 6.0], 3);
        assert!(out[3].is_nan());
        assert!((out[4] - 4.0).abs() < 1e-9);
    }

    #[test]
    fn macd_outputs_align_with_input() {
        let closes: Vec<f64> = (0..60).map(|i| 100.0 + (i as f64 * 0.37).sin()).collect();
        let (diff, dea, hist) = macd(&closes, 12, 26, 9);
        assert_eq!(diff.len(), closes.len());
        assert_eq!(dea.len(), closes.len());
        assert_eq!(hist.len(), closes.len());
        assert!(diff[24].is_nan());
        assert!(diff[25].is_finite());
        assert!(dea[32].is_nan());
        assert!(dea[33].is_finite());
        assert!((hist[40] - (diff[40] - dea[40])).abs() < 1e-12);
    }
}
