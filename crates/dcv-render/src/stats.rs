//! Numeric helpers for axis ranges and density estimates

/// Minimum number of histogram bins per axis in the density estimate
pub const MIN_KDE_BINS: usize = 5;

/// Finite values of `values`
#[must_use]
pub fn finite(values: &[f64]) -> Vec<f64> {
    values.iter().copied().filter(|v| v.is_finite()).collect()
}

/// Percentile with linear interpolation between closest ranks
///
/// `q` is in percent. Non-finite values are ignored; returns `None` when
/// nothing finite remains.
#[must_use]
pub fn percentile(values: &[f64], q: f64) -> Option<f64> {
    let mut data = finite(values);
    if data.is_empty() {
        return None;
    }
    data.sort_by(f64::total_cmp);
    Some(percentile_sorted(&data, q))
}

fn percentile_sorted(sorted: &[f64], q: f64) -> f64 {
    let q = q.clamp(0.0, 100.0);
    let pos = q / 100.0 * (sorted.len() - 1) as f64;
    let lo = pos.floor() as usize;
    let hi = pos.ceil() as usize;
    let frac = pos - lo as f64;
    sorted[lo] + (sorted[hi] - sorted[lo]) * frac
}

/// Axis range clipped to the 1st and 99th percentile
///
/// Degenerate ranges are widened so callers can always divide by the span.
#[must_use]
pub fn clipped_range(values: &[f64]) -> (f64, f64) {
    let mut data = finite(values);
    if data.is_empty() {
        return (0.0, 1.0);
    }
    data.sort_by(f64::total_cmp);
    let start = percentile_sorted(&data, 1.0);
    let end = percentile_sorted(&data, 99.0);
    if end > start {
        (start, end)
    } else {
        let pad = if start == 0.0 { 0.5 } else { start.abs() * 0.05 };
        (start - pad, end + pad)
    }
}

/// Sample skewness (biased, Fisher-Pearson)
fn skewness(data: &[f64]) -> f64 {
    let n = data.len() as f64;
    let mean = data.iter().sum::<f64>() / n;
    let m2 = data.iter().map(|v| (v - mean).powi(2)).sum::<f64>() / n;
    if m2 <= 0.0 {
        return 0.0;
    }
    let m3 = data.iter().map(|v| (v - mean).powi(3)).sum::<f64>() / n;
    m3 / m2.powf(1.5)
}

/// Number of histogram bins by Doane's rule
///
/// `k = 1 + log2(n) + log2(1 + |g1| / sigma_g1)` with
/// `sigma_g1 = sqrt(6 (n - 2) / ((n + 1) (n + 3)))`; the bin width is
/// `range / k` and the bin count `round(range / width)`.
#[must_use]
pub fn doane_bins(values: &[f64]) -> usize {
    let data = finite(values);
    let n = data.len();
    if n < 3 {
        return 1;
    }
    let (min, max) = data
        .iter()
        .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
    let range = max - min;
    if range <= 0.0 {
        return 1;
    }
    let nf = n as f64;
    let sigma_g1 = (6.0 * (nf - 2.0) / ((nf + 1.0) * (nf + 3.0))).sqrt();
    let k = 1.0 + nf.log2() + (1.0 + skewness(&data).abs() / sigma_g1).log2();
    let width = range / k;
    (range / width).round().max(1.0) as usize
}

/// Regular bins over `[min, max]`
#[derive(Debug, Clone, Copy, PartialEq)]
struct Bins {
    min: f64,
    width: f64,
    count: usize,
}

impl Bins {
    fn new(data: &[f64], count: usize) -> Self {
        let (min, max) = data
            .iter()
            .fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), &v| (lo.min(v), hi.max(v)));
        let (min, max) = if max > min { (min, max) } else { (min - 0.5, min + 0.5) };
        Self {
            min,
            width: (max - min) / count as f64,
            count,
        }
    }

    /// Bin of `v`; the right edge belongs to the last bin
    fn index(&self, v: f64) -> usize {
        (((v - self.min) / self.width).floor().max(0.0) as usize).min(self.count - 1)
    }

    /// Fractional position of `v` in bin-center coordinates, clamped
    fn center_position(&self, v: f64) -> f64 {
        let pos = (v - self.min) / self.width - 0.5;
        pos.clamp(0.0, (self.count - 1) as f64)
    }
}

/// Histogram-based kernel density estimate evaluated at each point
///
/// Points are binned on a 2-D histogram (Doane bins per axis, at least
/// [`MIN_KDE_BINS`]); the density at each point is bilinearly interpolated
/// between bin centers. Points with a non-finite coordinate get `NaN`.
#[must_use]
pub fn kde_histogram(x: &[f64], y: &[f64]) -> Vec<f64> {
    let n = x.len().min(y.len());
    let pairs: Vec<(f64, f64)> = (0..n)
        .map(|i| (x[i], y[i]))
        .filter(|(a, b)| a.is_finite() && b.is_finite())
        .collect();
    if pairs.is_empty() {
        return vec![f64::NAN; n];
    }
    let xs: Vec<f64> = pairs.iter().map(|p| p.0).collect();
    let ys: Vec<f64> = pairs.iter().map(|p| p.1).collect();
    let bx = Bins::new(&xs, doane_bins(&xs).max(MIN_KDE_BINS));
    let by = Bins::new(&ys, doane_bins(&ys).max(MIN_KDE_BINS));

    let mut hist = vec![0.0_f64; bx.count * by.count];
    for &(a, b) in &pairs {
        hist[bx.index(a) * by.count + by.index(b)] += 1.0;
    }

    (0..n)
        .map(|i| {
            let (a, b) = (x[i], y[i]);
            if !(a.is_finite() && b.is_finite()) {
                return f64::NAN;
            }
            let px = bx.center_position(a);
            let py = by.center_position(b);
            let (x0, y0) = (px.floor() as usize, py.floor() as usize);
            let (x1, y1) = ((x0 + 1).min(bx.count - 1), (y0 + 1).min(by.count - 1));
            let (fx, fy) = (px - x0 as f64, py - y0 as f64);
            let h = |ix: usize, iy: usize| hist[ix * by.count + iy];
            h(x0, y0) * (1.0 - fx) * (1.0 - fy)
                + h(x1, y0) * fx * (1.0 - fy)
                + h(x0, y1) * (1.0 - fx) * fy
                + h(x1, y1) * fx * fy
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn percentile_interpolates_linearly() {
        let data = [1.0, 2.0, 3.0, 4.0, 5.0];
        assert_eq!(percentile(&data, 0.0), Some(1.0));
        assert_eq!(percentile(&data, 50.0), Some(3.0));
        assert_eq!(percentile(&data, 100.0), Some(5.0));
        // pos = 0.99 * 4 = 3.96
        let p99 = percentile(&data, 99.0).unwrap();
        assert!((p99 - 4.96).abs() < 1e-12);
    }

    #[test]
    fn percentile_ignores_nan() {
        assert_eq!(percentile(&[f64::NAN, 2.0], 50.0), Some(2.0));
        assert_eq!(percentile(&[f64::NAN], 50.0), None);
        assert_eq!(percentile(&[], 50.0), None);
    }

    #[test]
    fn clipped_range_widens_constant_data() {
        let (lo, hi) = clipped_range(&[3.0; 10]);
        assert!(lo < 3.0 && hi > 3.0);
        assert_eq!(clipped_range(&[]), (0.0, 1.0));
    }

    #[test]
    fn doane_matches_hand_computation() {
        // symmetric data: g1 = 0, so k = 1 + log2(n)
        let data: Vec<f64> = (0..64).map(f64::from).collect();
        assert_eq!(doane_bins(&data), 7);
        assert_eq!(doane_bins(&[1.0, 2.0]), 1);
    }

    #[test]
    fn density_is_highest_in_the_cluster() {
        let mut x: Vec<f64> = (0..200).map(|i| 10.0 + f64::from(i % 5) * 0.01).collect();
        let mut y: Vec<f64> = (0..200).map(|i| 0.02 + f64::from(i % 3) * 0.001).collect();
        x.push(100.0);
        y.push(0.2);
        let density = kde_histogram(&x, &y);
        assert_eq!(density.len(), 201);
        assert!(density[0] > density[200]);
    }

    #[test]
    fn density_marks_non_finite_points() {
        let density = kde_histogram(&[1.0, f64::NAN, 3.0], &[1.0, 2.0, 3.0]);
        assert!(density[1].is_nan());
        assert!(density[0].is_finite());
    }

    proptest! {
        #[test]
        fn percentile_within_data_bounds(
            data in proptest::collection::vec(-1e6f64..1e6, 1..200),
            q in 0.0f64..100.0,
        ) {
            let p = percentile(&data, q).unwrap();
            let min = data.iter().copied().fold(f64::INFINITY, f64::min);
            let max = data.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(p >= min && p <= max);
        }

        #[test]
        fn density_is_non_negative(
            pts in proptest::collection::vec((-100.0f64..100.0, -1.0f64..1.0), 1..300),
        ) {
            let (x, y): (Vec<f64>, Vec<f64>) = pts.into_iter().unzip();
            for d in kde_histogram(&x, &y) {
                prop_assert!(d >= 0.0);
            }
        }
    }
}
