//! Peak Search
//!
//! Constrained local-maxima search over a sampled signal. A peak is accepted
//! when it satisfies all of:
//! - a minimum height,
//! - a minimum horizontal distance to every other accepted peak,
//! - a minimum topographic prominence.
//!
//! Constraints are applied in that order; prominence is only evaluated on the
//! survivors of the first two.

use std::cmp::Ordering;

/// Constraints for [`find_peaks`].
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PeakConstraints {
    pub min_height: f64,
    /// Minimum index distance between accepted peaks; values below 1 act as 1.
    pub min_distance: usize,
    pub min_prominence: f64,
}

/// Indices of all local maxima. Flat peaks report the midpoint of the plateau
/// (rounded down); plateaus touching either border are not peaks.
pub fn local_maxima(data: &[f64]) -> Vec<usize> {
    let mut peaks = Vec::new();
    if data.len() < 3 {
        return peaks;
    }
    let last = data.len() - 1;
    let mut i = 1;
    while i < last {
        if data[i - 1] < data[i] {
            let mut ahead = i + 1;
            while ahead < last && data[ahead] == data[i] {
                ahead += 1;
            }
            if data[ahead] < data[i] {
                peaks.push((i + ahead - 1) / 2);
                i = ahead;
            }
        }
        i += 1;
    }
    peaks
}

/// Removes peaks closer than `distance` samples to a taller peak. Taller peaks
/// are kept first; among equal heights the leftmost one wins.
pub fn select_by_distance(data: &[f64], peaks: &[usize], distance: usize) -> Vec<usize> {
    let distance = distance.max(1);
    if distance == 1 {
        return peaks.to_vec();
    }
    let mut priority: Vec<usize> = (0..peaks.len()).collect();
    priority.sort_by(|&a, &b| {
        data[peaks[b]]
            .partial_cmp(&data[peaks[a]])
            .unwrap_or(Ordering::Equal)
            .then(a.cmp(&b))
    });

    let mut keep = vec![true; peaks.len()];
    for &i in &priority {
        if !keep[i] {
            continue;
        }
        let mut j = i;
        while j > 0 && peaks[i] - peaks[j - 1] < distance {
            j -= 1;
            keep[j] = false;
        }
        let mut j = i + 1;
        while j < peaks.len() && peaks[j] - peaks[i] < distance {
            keep[j] = false;
            j += 1;
        }
    }
    peaks
        .iter()
        .zip(keep)
        .filter_map(|(&p, k)| k.then_some(p))
        .collect()
}

/// Topographic prominence of the peak at `peak`: the height above the higher
/// of the two minima between the peak and the nearest taller sample (or the
/// border) on each side.
pub fn prominence(data: &[f64], peak: usize) -> f64 {
    let height = data[peak];

    let mut left_min = height;
    for &v in data[..peak].iter().rev() {
        if v > height {
            break;
        }
        left_min = left_min.min(v);
    }

    let mut right_min = height;
    for &v in &data[peak + 1..] {
        if v > height {
            break;
        }
        right_min = right_min.min(v);
    }

    height - left_min.max(right_min)
}

/// Finds the peaks of `data` satisfying `constraints`, in index order.
pub fn find_peaks(data: &[f64], constraints: &PeakConstraints) -> Vec<usize> {
    let candidates: Vec<usize> = local_maxima(data)
        .into_iter()
        .filter(|&p| data[p] >= constraints.min_height)
        .collect();
    select_by_distance(data, &candidates, constraints.min_distance)
        .into_iter()
        .filter(|&p| prominence(data, p) >= constraints.min_prominence)
        .collect()
}
