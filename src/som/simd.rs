//! Vectorization-friendly inner loops for winner search.

/// Squared Euclidean distance between two equal-length slices.
/// Unrolled by four so the main loop autovectorizes.
#[inline]
pub fn distance_squared(a: &[f64], b: &[f64]) -> f64 {
    debug_assert_eq!(a.len(), b.len());

    let chunks = a.len() / 4;
    let mut acc = [0.0f64; 4];

    for i in 0..chunks {
        let base = i * 4;
        let d0 = a[base] - b[base];
        let d1 = a[base + 1] - b[base + 1];
        let d2 = a[base + 2] - b[base + 2];
        let d3 = a[base + 3] - b[base + 3];
        acc[0] += d0 * d0;
        acc[1] += d1 * d1;
        acc[2] += d2 * d2;
        acc[3] += d3 * d3;
    }

    let mut sum = (acc[0] + acc[1]) + (acc[2] + acc[3]);
    for i in chunks * 4..a.len() {
        let d = a[i] - b[i];
        sum += d * d;
    }

    sum
}

/// Index of the smallest value, lowest index on ties.
///
/// Returns `None` for an empty slice. Values must not be NaN.
#[inline]
pub fn argmin(values: &[f64]) -> Option<usize> {
    let mut best: Option<(usize, f64)> = None;
    for (i, &v) in values.iter().enumerate() {
        debug_assert!(!v.is_nan(), "NaN distance at index {}", i);
        match best {
            Some((_, b)) if v >= b => {}
            _ => best = Some((i, v)),
        }
    }
    best.map(|(i, _)| i)
}
