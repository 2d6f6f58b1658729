//! Cutoff-bounded Levenshtein distance.
//!
//! This is the inner loop of the fuzzy snippet search: it runs once per
//! candidate window over up to 10,000 characters of text, so it works on
//! pre-split `char` slices, reuses its two DP rows across calls, and bails
//! out as soon as the answer is known to exceed the cutoff.

/// Reusable DP rows for [`bounded_levenshtein`].
///
/// Grows to the longest `b` it has seen and is never shrunk, so repeated
/// calls do not allocate.
#[derive(Debug, Default, Clone)]
pub struct DistanceBuffers {
    prev: Vec<usize>,
    curr: Vec<usize>,
}

impl DistanceBuffers {
    /// Create empty buffers.
    pub fn new() -> Self {
        Self::default()
    }

    fn rows(&mut self, width: usize) -> (&mut [usize], &mut [usize]) {
        if self.prev.len() < width {
            self.prev.resize(width, 0);
            self.curr.resize(width, 0);
        }
        (&mut self.prev[..width], &mut self.curr[..width])
    }
}

/// Levenshtein distance between `a` and `b`, capped at `max + 1`.
///
/// Returns the exact distance when it is `<= max`, otherwise `max + 1`.
/// Exits early when the length difference alone exceeds `max`, and after any
/// DP row whose minimum already exceeds `max` (row minima never decrease).
pub fn bounded_levenshtein(
    a: &[char],
    b: &[char],
    max: usize,
    buffers: &mut DistanceBuffers,
) -> usize {
    let over = max + 1;
    if a.len().abs_diff(b.len()) > max {
        return over;
    }
    if a.is_empty() {
        return b.len();
    }
    if b.is_empty() {
        return a.len();
    }

    let width = b.len() + 1;
    let (mut prev, mut curr) = buffers.rows(width);
    for (j, cell) in prev.iter_mut().enumerate() {
        *cell = j;
    }

    for (i, &ca) in a.iter().enumerate() {
        curr[0] = i + 1;
        let mut row_min = curr[0];
        for (j, &cb) in b.iter().enumerate() {
            let substitution = prev[j] + usize::from(ca != cb);
            let deletion = prev[j + 1] + 1;
            let insertion = curr[j] + 1;
            let cell = substitution.min(deletion).min(insertion);
            curr[j + 1] = cell;
            row_min = row_min.min(cell);
        }
        if row_min > max {
            return over;
        }
        std::mem::swap(&mut prev, &mut curr);
    }

    let distance = prev[b.len()];
    if distance > max {
        over
    } else {
        distance
    }
}
