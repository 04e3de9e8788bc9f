//! Value series: the read-only view the pipeline takes of an upstream provider.
//!
//! Offsets count backwards from the current bar: offset 0 is the most recent
//! value, offset `len() - 1` the oldest one still available. Asking for an
//! offset the provider cannot supply yields `None`, which the pipeline treats
//! as insufficient history.

use std::collections::VecDeque;

/// Externally supplied, randomly indexable series of values.
pub trait ValueSeries {
    /// Number of bars currently available.
    fn len(&self) -> usize;

    /// Value `offset` bars before the current bar.
    fn get(&self, offset: usize) -> Option<f64>;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<T: ValueSeries + ?Sized> ValueSeries for &T {
    fn len(&self) -> usize {
        (**self).len()
    }

    fn get(&self, offset: usize) -> Option<f64> {
        (**self).get(offset)
    }
}

/// Borrowed view over chronologically ordered values (last element = offset 0).
#[derive(Debug, Clone, Copy)]
pub struct SeriesView<'a> {
    values: &'a [f64],
}

impl<'a> SeriesView<'a> {
    pub fn new(values: &'a [f64]) -> Self {
        Self { values }
    }

    /// View of `values[..=bar_index]`, i.e. the series as it looked at `bar_index`.
    pub fn at_bar(values: &'a [f64], bar_index: usize) -> Self {
        let end = (bar_index + 1).min(values.len());
        Self {
            values: &values[..end],
        }
    }
}

impl ValueSeries for SeriesView<'_> {
    fn len(&self) -> usize {
        self.values.len()
    }

    fn get(&self, offset: usize) -> Option<f64> {
        let len = self.values.len();
        if offset < len {
            Some(self.values[len - 1 - offset])
        } else {
            None
        }
    }
}

/// Owned history buffer, optionally bounded to the most recent `capacity` values.
#[derive(Debug, Clone, Default)]
pub struct SeriesBuffer {
    values: VecDeque<f64>,
    capacity: Option<usize>,
}

impl SeriesBuffer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Buffer that keeps at most `capacity` values, dropping the oldest.
    ///
    /// Storage grows with the pushed values, not with `capacity`.
    pub fn bounded(capacity: usize) -> Self {
        Self {
            values: VecDeque::new(),
            capacity: Some(capacity),
        }
    }

    pub fn push(&mut self, value: f64) {
        if let Some(cap) = self.capacity {
            if cap == 0 {
                return;
            }
            while self.values.len() >= cap {
                self.values.pop_front();
            }
        }
        self.values.push_back(value);
    }

    /// Overwrite the current (offset 0) value, e.g. on an intrabar tick.
    pub fn replace_last(&mut self, value: f64) -> bool {
        match self.values.back_mut() {
            Some(last) => {
                *last = value;
                true
            }
            None => false,
        }
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }
}

impl ValueSeries for SeriesBuffer {
    fn len(&self) -> usize {
        self.values.len()
    }

    fn get(&self, offset: usize) -> Option<f64> {
        let len = self.values.len();
        if offset < len {
            self.values.get(len - 1 - offset).copied()
        } else {
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn view_offsets_count_backwards() {
        let values = [1.0, 2.0, 3.0];
        let view = SeriesView::new(&values);
        assert_eq!(view.len(), 3);
        assert_eq!(view.get(0), Some(3.0));
        assert_eq!(view.get(2), Some(1.0));
        assert_eq!(view.get(3), None);
    }

    #[test]
    fn view_at_bar_truncates_future() {
        let values = [1.0, 2.0, 3.0, 4.0];
        let view = SeriesView::at_bar(&values, 1);
        assert_eq!(view.len(), 2);
        assert_eq!(view.get(0), Some(2.0));
        assert_eq!(SeriesView::at_bar(&values, 10).len(), 4);
    }

    #[test]
    fn empty_view() {
        let view = SeriesView::new(&[]);
        assert!(view.is_empty());
        assert_eq!(view.get(0), None);
    }

    #[test]
    fn buffer_unbounded_keeps_everything() {
        let mut buf = SeriesBuffer::new();
        for i in 0..100 {
            buf.push(i as f64);
        }
        assert_eq!(buf.len(), 100);
        assert_eq!(buf.get(0), Some(99.0));
        assert_eq!(buf.get(99), Some(0.0));
        assert_eq!(buf.capacity(), None);
    }

    #[test]
    fn buffer_bounded_drops_oldest() {
        let mut buf = SeriesBuffer::bounded(3);
        for i in 0..5 {
            buf.push(i as f64);
        }
        assert_eq!(buf.len(), 3);
        assert_eq!(buf.get(0), Some(4.0));
        assert_eq!(buf.get(2), Some(2.0));
        assert_eq!(buf.get(3), None);
    }

    #[test]
    fn buffer_huge_bound_allocates_lazily() {
        let mut buf = SeriesBuffer::bounded(1 << 40);
        buf.push(1.0);
        buf.push(2.0);
        assert_eq!(buf.len(), 2);
        assert_eq!(buf.capacity(), Some(1 << 40));
        assert_eq!(buf.get(0), Some(2.0));
    }

    #[test]
    fn buffer_replace_last() {
        let mut buf = SeriesBuffer::new();
        assert!(!buf.replace_last(1.0));
        buf.push(1.0);
        buf.push(2.0);
        assert!(buf.replace_last(5.0));
        assert_eq!(buf.get(0), Some(5.0));
        assert_eq!(buf.get(1), Some(1.0));
        buf.clear();
        assert!(buf.is_empty());
    }

    #[test]
    fn reference_forwards_to_series() {
        let buf = {
            let mut b = SeriesBuffer::new();
            b.push(7.0);
            b
        };
        let r = &buf;
        assert_eq!(ValueSeries::len(&r), 1);
        assert_eq!(ValueSeries::get(&r, 0), Some(7.0));
    }
}
