use std::cmp::Ordering;

#[derive(Debug, Clone, Copy)]
pub enum SortOrder {
    Ascending,
    Descending,
}

/// argsort returns the indices that would sort an array. NaN values are ordered with
/// `f64::total_cmp` semantics, so the result is always well defined. The sort is stable, i.e.
/// equal values keep their original relative order.
pub fn argsort(x: &[f64], order: SortOrder) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..x.len()).collect();
    match order {
        SortOrder::Ascending => indices.sort_by(|&a, &b| x[a].total_cmp(&x[b])),
        SortOrder::Descending => indices.sort_by(|&a, &b| x[b].total_cmp(&x[a])),
    }
    indices
}

/// argmax_by returns the index of the first maximum element according to the comparison
/// function. Returns `None` for an empty slice.
pub fn argmax_by<T, F>(x: &[T], mut compare: F) -> Option<usize>
where
    F: FnMut(&T, &T) -> Ordering,
{
    let mut idx_max: Option<usize> = None;

    for (i, val) in x.iter().enumerate() {
        match idx_max {
            None => idx_max = Some(i),
            Some(j) => {
                if compare(val, &x[j]) == Ordering::Greater {
                    idx_max = Some(i)
                }
            }
        }
    }

    idx_max
}

/// lin_interp returns the linearly interpolated value at x for given discrete data points xp, fp.
/// xp must be increasing. Values outside the range of xp are clamped to the first or last entry
/// of fp. Inspired by numpy.interp.
pub fn lin_interp(x: f64, xp: &[f64], fp: &[f64]) -> f64 {
    debug_assert_eq!(xp.len(), fp.len(), "Number of items in xp and fp must be equal!");

    let n = xp.len().min(fp.len());
    if n == 0 {
        return 0.0;
    }

    if x <= xp[0] {
        return fp[0];
    }

    for i in 1..n {
        if x <= xp[i] {
            return fp[i - 1] + (x - xp[i - 1]) * (fp[i] - fp[i - 1]) / (xp[i] - xp[i - 1]);
        }
    }

    fp[n - 1]
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn argsort_descending_is_stable() {
        let idxs = argsort(&[1.0, 3.0, 1.0, 2.0], SortOrder::Descending);
        assert_eq!(idxs, vec![1, 3, 0, 2]);
    }

    #[test]
    fn argsort_ascending() {
        let idxs = argsort(&[0.5, -1.0, 4.0], SortOrder::Ascending);
        assert_eq!(idxs, vec![1, 0, 2]);
    }

    #[test]
    fn argmax_by_prefers_first_of_equal_maxima() {
        let vals = [2, 7, 7, 1];
        assert_eq!(argmax_by(&vals, |a, b| a.cmp(b)), Some(1));
        assert_eq!(argmax_by::<i32, _>(&[], |a, b| a.cmp(b)), None);
    }

    #[test]
    fn lin_interp_inside_and_clamped() {
        let xp = [0.0, 1.0, 3.0];
        let fp = [10.0, 20.0, 0.0];
        assert_relative_eq!(lin_interp(0.5, &xp, &fp), 15.0);
        assert_relative_eq!(lin_interp(2.0, &xp, &fp), 10.0);
        assert_relative_eq!(lin_interp(-4.0, &xp, &fp), 10.0);
        assert_relative_eq!(lin_interp(9.0, &xp, &fp), 0.0);
    }
}
