use std::collections::VecDeque;

use crate::mask::types::Mask;

/// Rolling average over recent raw masks.
///
/// Keeps a bounded most-recent-first history and emits the element-wise
/// mean of the retained masks. A longer history trades afterimages for
/// less frame-to-frame flicker; the history length is the only knob.
#[derive(Debug, Default)]
pub struct MaskSmoother {
    history: VecDeque<Mask>,
}

impl MaskSmoother {
    pub fn new() -> Self {
        Self {
            history: VecDeque::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.history.len()
    }

    pub fn is_empty(&self) -> bool {
        self.history.is_empty()
    }

    pub fn clear(&mut self) {
        self.history.clear();
    }

    /// Insert a raw mask and return the mean over the retained history.
    ///
    /// The history is truncated to `capacity` (at least 1), oldest masks
    /// evicted first. A raw mask whose dimensions differ from the history
    /// (capture resolution change) resets the history first.
    pub fn push(&mut self, raw: Mask, capacity: usize) -> Mask {
        let capacity = capacity.max(1);

        if self
            .history
            .front()
            .is_some_and(|m| m.dimensions() != raw.dimensions())
        {
            self.history.clear();
        }

        self.history.push_front(raw);
        self.history.truncate(capacity);

        // history is non-empty here, the average always exists
        self.average().unwrap_or_else(|| Mask::new(0, 0))
    }

    /// Element-wise mean of the retained masks, or `None` when empty
    pub fn average(&self) -> Option<Mask> {
        let first = self.history.front()?;
        let (width, height) = first.dimensions();

        let mut sum = vec![0.0f32; (width * height) as usize];
        for mask in &self.history {
            for (acc, v) in sum.iter_mut().zip(mask.data()) {
                *acc += v;
            }
        }

        let n = self.history.len() as f32;
        for acc in &mut sum {
            *acc /= n;
        }

        Mask::from_raw(width, height, sum)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn uniform(value: f32) -> Mask {
        Mask::new_filled(4, 2, value)
    }

    #[test]
    fn test_mean_over_retained_history() {
        let mut smoother = MaskSmoother::new();

        let out = smoother.push(uniform(1.0), 3);
        assert!((out.get(0, 0) - 1.0).abs() < 1e-6);

        let out = smoother.push(uniform(0.0), 3);
        assert!((out.get(0, 0) - 0.5).abs() < 1e-6);

        let out = smoother.push(uniform(0.5), 3);
        assert!((out.get(3, 1) - 0.5).abs() < 1e-6);
    }

    #[test]
    fn test_oldest_evicted_on_overflow() {
        let mut smoother = MaskSmoother::new();
        smoother.push(uniform(1.0), 2);
        smoother.push(uniform(0.0), 2);
        // The 1.0 mask falls out of the window here
        let out = smoother.push(uniform(0.0), 2);
        assert_eq!(smoother.len(), 2);
        assert!(out.get(0, 0).abs() < 1e-6);
    }

    #[test]
    fn test_capacity_shrink_truncates() {
        let mut smoother = MaskSmoother::new();
        smoother.push(uniform(1.0), 4);
        smoother.push(uniform(1.0), 4);
        smoother.push(uniform(1.0), 4);

        let out = smoother.push(uniform(0.0), 1);
        assert_eq!(smoother.len(), 1);
        assert!(out.get(0, 0).abs() < 1e-6);
    }

    #[test]
    fn test_capacity_zero_behaves_as_one() {
        let mut smoother = MaskSmoother::new();
        let out = smoother.push(uniform(0.25), 0);
        assert_eq!(smoother.len(), 1);
        assert!((out.get(0, 0) - 0.25).abs() < 1e-6);
    }

    #[test]
    fn test_dimension_change_resets_history() {
        let mut smoother = MaskSmoother::new();
        smoother.push(uniform(1.0), 3);
        let out = smoother.push(Mask::new_filled(8, 8, 0.0), 3);
        assert_eq!(smoother.len(), 1);
        assert!(out.get(0, 0).abs() < 1e-6);
    }
}
