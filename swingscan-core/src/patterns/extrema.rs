//! Local extrema with minimum-separation and minimum-prominence filters.
//!
//! Candidates are strict local maxima; a flat top counts once, at its first
//! bar. Separation is enforced greedily from the highest candidate down, so
//! of two nearby peaks the taller survives. Prominence is the height of a
//! peak above the higher of the lowest points on either side, each side
//! extending until the series rises above the peak.

/// Indices of peaks in `values`, ascending.
pub fn find_peaks(values: &[f64], min_separation: usize, min_prominence: f64) -> Vec<usize> {
    let candidates = local_maxima(values);
    let spaced = enforce_separation(values, candidates, min_separation);
    spaced
        .into_iter()
        .filter(|&i| prominence(values, i) >= min_prominence)
        .collect()
}

/// Indices of troughs in `values`, ascending.
pub fn find_troughs(values: &[f64], min_separation: usize, min_prominence: f64) -> Vec<usize> {
    let negated: Vec<f64> = values.iter().map(|v| -v).collect();
    find_peaks(&negated, min_separation, min_prominence)
}

fn local_maxima(values: &[f64]) -> Vec<usize> {
    let n = values.len();
    let mut peaks = Vec::new();
    let mut i = 1;
    while i + 1 < n {
        if values[i].is_nan() || !(values[i] > values[i - 1]) {
            i += 1;
            continue;
        }
        let mut end = i;
        while end + 1 < n && values[end + 1] == values[i] {
            end += 1;
        }
        if end + 1 < n && values[end + 1] < values[i] {
            peaks.push(i);
        }
        i = end + 1;
    }
    peaks
}

fn enforce_separation(values: &[f64], candidates: Vec<usize>, min_separation: usize) -> Vec<usize> {
    if min_separation <= 1 || candidates.len() < 2 {
        return candidates;
    }
    let mut order: Vec<usize> = (0..candidates.len()).collect();
    // Tallest first; ties keep the earlier bar.
    order.sort_by(|&a, &b| {
        values[candidates[b]]
            .total_cmp(&values[candidates[a]])
            .then(candidates[a].cmp(&candidates[b]))
    });

    let mut keep = vec![true; candidates.len()];
    for &pos in &order {
        if !keep[pos] {
            continue;
        }
        let idx = candidates[pos];
        for (other, &other_idx) in candidates.iter().enumerate() {
            if other != pos && keep[other] && idx.abs_diff(other_idx) < min_separation {
                keep[other] = false;
            }
        }
    }
    candidates
        .into_iter()
        .zip(keep)
        .filter_map(|(idx, k)| k.then_some(idx))
        .collect()
}

/// Topographic prominence of the peak at `i`.
pub fn prominence(values: &[f64], i: usize) -> f64 {
    let peak = values[i];

    let mut left_min = peak;
    for &v in values[..i].iter().rev() {
        if v > peak {
            break;
        }
        left_min = left_min.min(v);
    }

    let mut right_min = peak;
    for &v in &values[i + 1..] {
        if v > peak {
            break;
        }
        right_min = right_min.min(v);
    }

    peak - left_min.max(right_min)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn simple_peaks_and_troughs() {
        let v = [1.0, 3.0, 1.0, 5.0, 1.0, 2.0, 0.0];
        assert_eq!(find_peaks(&v, 1, 0.0), vec![1, 3, 5]);
        assert_eq!(find_troughs(&v, 1, 0.0), vec![2, 4]);
    }

    #[test]
    fn edges_are_not_extrema() {
        let v = [5.0, 1.0, 5.0];
        assert!(find_peaks(&v, 1, 0.0).is_empty());
        assert_eq!(find_troughs(&v, 1, 0.0), vec![1]);
    }

    #[test]
    fn plateau_resolves_to_first_bar() {
        let v = [1.0, 4.0, 4.0, 4.0, 2.0];
        assert_eq!(find_peaks(&v, 1, 0.0), vec![1]);
        // rising plateau into a higher value is not a peak
        let v = [1.0, 4.0, 4.0, 6.0, 2.0];
        assert_eq!(find_peaks(&v, 1, 0.0), vec![3]);
    }

    #[test]
    fn separation_keeps_taller_peak() {
        let v = [0.0, 3.0, 0.0, 5.0, 0.0, 0.0, 0.0, 4.0, 0.0];
        assert_eq!(find_peaks(&v, 3, 0.0), vec![3, 7]);
        assert_eq!(find_peaks(&v, 5, 0.0), vec![3]);
    }

    #[test]
    fn prominence_filters_ripples() {
        // ripple at 3 sits 0.5 above its higher base
        let v = [0.0, 10.0, 8.0, 8.5, 8.0, 12.0, 0.0];
        assert_eq!(prominence(&v, 3), 0.5);
        assert_eq!(prominence(&v, 1), 2.0);
        assert_eq!(prominence(&v, 5), 12.0);
        assert_eq!(find_peaks(&v, 1, 1.0), vec![1, 5]);
    }

    #[test]
    fn output_is_ascending() {
        let v: Vec<f64> = (0..200).map(|i| ((i as f64) * 0.37).sin() * (1.0 + i as f64 * 0.01)).collect();
        let peaks = find_peaks(&v, 4, 0.1);
        assert!(peaks.windows(2).all(|w| w[0] < w[1] && w[1] - w[0] >= 4));
    }
}
