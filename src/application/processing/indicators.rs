//! Rolling-window indicators over an ascending series.
//!
//! Stored indicators (Bollinger Bands, RSI) work on `Option<Decimal>` columns:
//! a window containing a missing value yields a missing result. Chart-only
//! overlays (EMA, MACD, Stochastic) work on complete f64 columns.

use crate::application::processing::{round_f64, round2};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use statrs::statistics::{Data, Distribution};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BollingerPoint {
    pub ma: Option<Decimal>,
    pub upper: Option<Decimal>,
    pub lower: Option<Decimal>,
}

pub fn typical_price(
    high: Option<Decimal>,
    low: Option<Decimal>,
    close: Option<Decimal>,
) -> Option<Decimal> {
    high?
        .checked_add(low?)?
        .checked_add(close?)?
        .checked_div(Decimal::from(3))
}

/// Bollinger Bands over typical price with a trailing sample standard deviation.
pub fn bollinger_bands(
    high: &[Option<Decimal>],
    low: &[Option<Decimal>],
    close: &[Option<Decimal>],
    period: usize,
    std_mult: Decimal,
) -> Vec<BollingerPoint> {
    let typical: Vec<Option<Decimal>> = high
        .iter()
        .zip(low)
        .zip(close)
        .map(|((h, l), c)| typical_price(*h, *l, *c))
        .collect();

    let mut out = vec![BollingerPoint::default(); typical.len()];
    if period == 0 {
        return out;
    }
    for end in (period - 1)..typical.len() {
        let Some(window) = complete_window(&typical[end + 1 - period..=end]) else {
            continue;
        };
        if let Some(point) = band_point(&window, std_mult) {
            out[end] = point;
        }
    }
    out
}

fn checked_sum(values: &[Decimal]) -> Option<Decimal> {
    values
        .iter()
        .try_fold(Decimal::ZERO, |acc, v| acc.checked_add(*v))
}

/// `None` when the window mean overflows.
fn band_point(window: &[Decimal], std_mult: Decimal) -> Option<BollingerPoint> {
    let ma = round2(checked_sum(window)?.checked_div(Decimal::from(window.len()))?);

    // statrs at an f64 boundary; std_dev() is the n-1 estimator
    let data = Data::new(
        window
            .iter()
            .map(|v| v.to_f64().unwrap_or(f64::NAN))
            .collect::<Vec<_>>(),
    );
    let std = data
        .std_dev()
        .filter(|s| s.is_finite())
        .and_then(Decimal::from_f64_retain);

    let width = std.and_then(|s| s.checked_mul(std_mult));
    Some(BollingerPoint {
        ma: Some(ma),
        upper: width.and_then(|w| ma.checked_add(w)).map(round2),
        lower: width.and_then(|w| ma.checked_sub(w)).map(round2),
    })
}

fn complete_window(window: &[Option<Decimal>]) -> Option<Vec<Decimal>> {
    window.iter().copied().collect()
}

/// Simple-average RSI (trailing mean of gains and losses, not Wilder smoothing).
pub fn rsi(close: &[Option<Decimal>], period: usize) -> Vec<Option<Decimal>> {
    // An overflowing delta poisons every window containing it
    let mut gains = vec![Some(Decimal::ZERO); close.len()];
    let mut losses = vec![Some(Decimal::ZERO); close.len()];
    for i in 1..close.len() {
        if let (Some(prev), Some(cur)) = (close[i - 1], close[i]) {
            let delta = cur.checked_sub(prev);
            gains[i] = delta.map(|d| round2(d.max(Decimal::ZERO)));
            losses[i] = delta.map(|d| round2((-d).max(Decimal::ZERO)));
        }
    }

    let mut out = vec![None; close.len()];
    if period == 0 {
        return out;
    }
    let n = Decimal::from(period);
    for end in (period - 1)..close.len() {
        let start = end + 1 - period;
        let average = |column: &[Option<Decimal>]| -> Option<Decimal> {
            checked_sum(&complete_window(&column[start..=end])?)?.checked_div(n)
        };
        if let (Some(avg_gain), Some(avg_loss)) = (average(&gains), average(&losses)) {
            out[end] = relative_strength_index(avg_gain, avg_loss);
        }
    }
    out
}

/// RSI from average gain and loss.
///
/// A flat window (both averages zero) has no defined RSI.
pub fn relative_strength_index(avg_gain: Decimal, avg_loss: Decimal) -> Option<Decimal> {
    let hundred = Decimal::ONE_HUNDRED;
    if avg_loss.is_zero() {
        return if avg_gain.is_zero() {
            None
        } else {
            Some(hundred)
        };
    }
    let rs = avg_gain.checked_div(avg_loss)?;
    let rsi = hundred.checked_sub(hundred.checked_div(Decimal::ONE.checked_add(rs)?)?)?;
    Some(round2(rsi))
}

/// Exponential moving average with `alpha = 2 / (span + 1)`, seeded with the
/// first value.
pub fn ema(values: &[f64], span: usize) -> Vec<f64> {
    let alpha = 2.0 / (span as f64 + 1.0);
    let mut out = Vec::with_capacity(values.len());
    let mut prev: Option<f64> = None;
    for &v in values {
        let next = match prev {
            Some(p) => alpha * v + (1.0 - alpha) * p,
            None => v,
        };
        out.push(next);
        prev = Some(next);
    }
    out
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MacdPoint {
    pub macd: Option<Decimal>,
    pub signal: Option<Decimal>,
    pub histogram: Option<Decimal>,
}

pub fn macd(close: &[f64], fast: usize, slow: usize, signal_span: usize) -> Vec<MacdPoint> {
    let fast_ema = ema(close, fast);
    let slow_ema = ema(close, slow);
    let line: Vec<Option<Decimal>> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| round_f64(f - s, 2))
        .collect();

    // The signal runs over the rounded line
    let line_f64: Vec<f64> = line
        .iter()
        .map(|v| v.and_then(|d| d.to_f64()).unwrap_or(f64::NAN))
        .collect();
    let signal = ema(&line_f64, signal_span);

    line.iter()
        .zip(signal)
        .map(|(m, s)| {
            let signal = round_f64(s, 2);
            let histogram = match (m, signal) {
                (Some(m), Some(s)) => m.checked_sub(s).map(round2),
                _ => None,
            };
            MacdPoint {
                macd: *m,
                signal,
                histogram,
            }
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StochasticPoint {
    pub k: Option<Decimal>,
    pub d: Option<Decimal>,
}

/// Stochastic oscillator: %K over the trailing high/low range, %D its simple mean.
/// A zero range leaves %K missing.
pub fn stochastic(
    high: &[f64],
    low: &[f64],
    close: &[f64],
    k_period: usize,
    d_period: usize,
) -> Vec<StochasticPoint> {
    let len = close.len().min(high.len()).min(low.len());
    let mut raw_k: Vec<Option<f64>> = vec![None; len];
    if k_period > 0 {
        for end in (k_period - 1)..len {
            let start = end + 1 - k_period;
            let lowest = low[start..=end].iter().copied().fold(f64::INFINITY, f64::min);
            let highest = high[start..=end]
                .iter()
                .copied()
                .fold(f64::NEG_INFINITY, f64::max);
            let range = highest - lowest;
            if range > 0.0 {
                raw_k[end] = Some(100.0 * (close[end] - lowest) / range);
            }
        }
    }

    (0..len)
        .map(|i| {
            let d = if d_period > 0 && i + 1 >= d_period {
                raw_k[i + 1 - d_period..=i]
                    .iter()
                    .copied()
                    .collect::<Option<Vec<f64>>>()
                    .and_then(|w| round_f64(w.iter().sum::<f64>() / d_period as f64, 2))
            } else {
                None
            };
            StochasticPoint {
                k: raw_k[i].and_then(|k| round_f64(k, 2)),
                d,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn some(values: &[Decimal]) -> Vec<Option<Decimal>> {
        values.iter().copied().map(Some).collect()
    }

    #[test]
    fn test_constant_typical_price_collapses_bands() {
        let col = some(&[dec!(50); 20]);
        let bands = bollinger_bands(&col, &col, &col, 20, dec!(2));
        assert!(bands[..19].iter().all(|b| b.ma.is_none()));
        let last = bands[19];
        assert_eq!(last.ma, Some(dec!(50)));
        assert_eq!(last.upper, Some(dec!(50)));
        assert_eq!(last.lower, Some(dec!(50)));
    }

    #[test]
    fn test_bands_use_sample_std_dev() {
        // typical prices 1, 2, 3: mean 2, sample std 1
        let col = some(&[dec!(1), dec!(2), dec!(3)]);
        let bands = bollinger_bands(&col, &col, &col, 3, dec!(2));
        assert_eq!(bands[2].ma, Some(dec!(2)));
        assert_eq!(bands[2].upper, Some(dec!(4)));
        assert_eq!(bands[2].lower, Some(dec!(0)));
    }

    #[test]
    fn test_missing_value_poisons_window() {
        let mut col = some(&[dec!(1), dec!(2), dec!(3), dec!(4)]);
        col[1] = None;
        let bands = bollinger_bands(&col, &col, &col, 2, dec!(2));
        assert!(bands[1].ma.is_none());
        assert!(bands[2].ma.is_none());
        assert_eq!(bands[3].ma, Some(dec!(3.5)));
    }

    #[test]
    fn test_band_ordering() {
        let close = some(&[
            dec!(10.5),
            dec!(11.2),
            dec!(9.8),
            dec!(12.4),
            dec!(13.1),
            dec!(12.9),
            dec!(11.7),
        ]);
        let high: Vec<_> = close.iter().map(|c| c.map(|v| v + dec!(0.7))).collect();
        let low: Vec<_> = close.iter().map(|c| c.map(|v| v - dec!(0.4))).collect();
        for b in bollinger_bands(&high, &low, &close, 3, dec!(2)) {
            if let (Some(u), Some(m), Some(l)) = (b.upper, b.ma, b.lower) {
                assert!(u >= m && m >= l);
            }
        }
    }

    #[test]
    fn test_rsi_only_gains_is_100() {
        assert_eq!(
            relative_strength_index(dec!(5), Decimal::ZERO),
            Some(dec!(100))
        );
    }

    #[test]
    fn test_rsi_flat_window_is_missing() {
        assert_eq!(relative_strength_index(Decimal::ZERO, Decimal::ZERO), None);
    }

    #[test]
    fn test_rsi_balanced_window_is_50() {
        assert_eq!(relative_strength_index(dec!(2), dec!(2)), Some(dec!(50)));
    }

    #[test]
    fn test_rsi_series() {
        // deltas: +1, -1, +2 -> window of 3 at index 3 has gains 1,0,2 losses 0,1,0
        let close = some(&[dec!(10), dec!(11), dec!(10), dec!(12)]);
        let out = rsi(&close, 3);
        assert_eq!(out[0], None);
        assert_eq!(out[1], None);
        // index 2: gains 0,1,0 losses 0,0,1 -> rs 1 -> 50
        assert_eq!(out[2], Some(dec!(50)));
        // index 3: avg gain 1, avg loss 1/3 -> rs 3 -> 75
        assert_eq!(out[3], Some(dec!(75)));
    }

    #[test]
    fn test_rsi_bounds() {
        let close = some(&[
            dec!(44.34),
            dec!(44.09),
            dec!(44.15),
            dec!(43.61),
            dec!(44.33),
            dec!(44.83),
            dec!(45.10),
            dec!(45.42),
            dec!(45.84),
            dec!(46.08),
        ]);
        for v in rsi(&close, 4).into_iter().flatten() {
            assert!(v >= Decimal::ZERO && v <= dec!(100));
        }
    }

    #[test]
    fn test_overflowing_prices_leave_indicators_missing() {
        let mut col = some(&[dec!(10), dec!(11), dec!(12), dec!(13)]);
        col[3] = Some(Decimal::MAX);
        assert_eq!(typical_price(col[3], col[3], col[3]), None);

        let bands = bollinger_bands(&col, &col, &col, 2, dec!(2));
        assert_eq!(bands[2].ma, Some(dec!(11.5)));
        assert!(bands[3].ma.is_none());

        let mut close = col.clone();
        close[2] = Some(Decimal::MIN);
        let out = rsi(&close, 2);
        assert!(out[2].is_none() && out[3].is_none());
        assert_eq!(out[1], Some(dec!(100)));
    }

    #[test]
    fn test_ema_seeded_with_first_value() {
        let out = ema(&[10.0, 20.0, 20.0], 3);
        assert_eq!(out, vec![10.0, 15.0, 17.5]);
    }

    #[test]
    fn test_macd_of_constant_series_is_zero() {
        let points = macd(&[100.0; 40], 12, 26, 9);
        let last = points[39];
        assert_eq!(last.macd, Some(dec!(0)));
        assert_eq!(last.signal, Some(dec!(0)));
        assert_eq!(last.histogram, Some(dec!(0)));
    }

    #[test]
    fn test_stochastic() {
        let high = [10.0, 12.0, 14.0, 14.0];
        let low = [8.0, 9.0, 10.0, 10.0];
        let close = [9.0, 11.0, 13.0, 12.0];
        let out = stochastic(&high, &low, &close, 3, 2);
        assert_eq!(out[1].k, None);
        // window [8, 14], close 13 -> 83.33
        assert_eq!(out[2].k, Some(dec!(83.33)));
        // window [9, 14], close 12 -> 60
        assert_eq!(out[3].k, Some(dec!(60)));
        assert_eq!(out[2].d, None);
        assert_eq!(out[3].d, Some(dec!(71.67)));
    }

    #[test]
    fn test_stochastic_zero_range_is_missing() {
        let flat = [5.0; 4];
        let out = stochastic(&flat, &flat, &flat, 3, 3);
        assert!(out.iter().all(|p| p.k.is_none() && p.d.is_none()));
    }
}
