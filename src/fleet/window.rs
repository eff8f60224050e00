//! Virtualized list geometry.
//!
//! Rows start at a uniform estimated height. Once a row has been laid out its
//! measured height replaces the estimate. Heights live in an index-keyed map
//! beside the record list, and `offsets` holds their prefix sums so that the
//! window for any scroll position is two binary searches away.
//!
//! All extents are in terminal lines.

use std::collections::HashMap;
use std::ops::Range;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RowHeight {
    Estimated(u32),
    Measured(u32),
}

impl RowHeight {
    pub fn get(self) -> u32 {
        match self {
            RowHeight::Estimated(h) | RowHeight::Measured(h) => h,
        }
    }
}

/// Rows to mount for the current scroll position, plus the blank extents
/// standing in for everything that is not mounted.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct VisibleWindow {
    pub start: usize,
    /// Exclusive.
    pub end: usize,
    pub spacer_above: u32,
    pub spacer_below: u32,
    pub total_extent: u32,
    pub heights: Vec<RowHeight>,
}

impl VisibleWindow {
    pub fn indices(&self) -> Range<usize> {
        self.start..self.end
    }

    pub fn is_empty(&self) -> bool {
        self.start == self.end
    }

    #[cfg(test)]
    pub fn rendered_extent(&self) -> u32 {
        self.heights.iter().map(|h| h.get()).sum()
    }
}

#[derive(Debug)]
pub struct VirtualList {
    estimate: u32,
    overscan: usize,
    row_count: usize,
    measured: HashMap<usize, u32>,
    /// `offsets[i]` is the top of row `i`; `offsets[row_count]` is the total extent.
    offsets: Vec<u32>,
    scroll: u32,
    viewport: u32,
    window: VisibleWindow,
}

impl VirtualList {
    pub fn new(estimate: u32, overscan: usize) -> Self {
        Self {
            estimate: estimate.max(1),
            overscan,
            row_count: 0,
            measured: HashMap::new(),
            offsets: vec![0],
            scroll: 0,
            viewport: 0,
            window: VisibleWindow::default(),
        }
    }

    pub fn window(&self) -> &VisibleWindow {
        &self.window
    }

    pub fn scroll(&self) -> u32 {
        self.scroll
    }

    pub fn row_count(&self) -> usize {
        self.row_count
    }

    pub fn total_extent(&self) -> u32 {
        self.offsets[self.row_count]
    }

    pub fn max_scroll(&self) -> u32 {
        self.total_extent().saturating_sub(self.viewport)
    }

    pub fn height_of(&self, index: usize) -> RowHeight {
        match self.measured.get(&index) {
            Some(&h) => RowHeight::Measured(h),
            None => RowHeight::Estimated(self.estimate),
        }
    }

    /// Top offset of a row, if it exists.
    pub fn offset_of(&self, index: usize) -> Option<u32> {
        (index < self.row_count).then(|| self.offsets[index])
    }

    /// Row covering the given absolute offset.
    pub fn row_at_offset(&self, offset: u32) -> Option<usize> {
        if offset >= self.total_extent() {
            return None;
        }
        Some(self.offsets[1..=self.row_count].partition_point(|&bottom| bottom <= offset))
    }

    /// Returns whether the scroll offset actually moved.
    pub fn set_scroll(&mut self, offset: u32) -> bool {
        let clamped = offset.min(self.max_scroll());
        if clamped == self.scroll {
            return false;
        }
        self.scroll = clamped;
        self.recompute();
        true
    }

    pub fn scroll_by(&mut self, delta: i64) -> bool {
        let target = (self.scroll as i64 + delta).clamp(0, u32::MAX as i64) as u32;
        self.set_scroll(target)
    }

    pub fn set_viewport(&mut self, height: u32) {
        if height == self.viewport {
            return;
        }
        self.viewport = height;
        self.scroll = self.scroll.min(self.max_scroll());
        self.recompute();
    }

    /// Rows were reordered or replaced; every index now names a different
    /// record, so all measurements are stale.
    pub fn reset_rows(&mut self, count: usize) {
        self.row_count = count;
        self.measured.clear();
        self.rebuild_offsets();
    }

    /// Record the laid-out height of a row. Returns whether the total extent
    /// changed.
    pub fn measure(&mut self, index: usize, height: u32) -> bool {
        if index >= self.row_count {
            return false;
        }
        let height = height.max(1);
        let previous = self.height_of(index).get();
        self.measured.insert(index, height);
        if previous == height {
            return false;
        }
        let delta = height as i64 - previous as i64;
        for offset in &mut self.offsets[index + 1..] {
            *offset = (*offset as i64 + delta) as u32;
        }
        self.scroll = self.scroll.min(self.max_scroll());
        self.recompute();
        true
    }

    /// Scroll the minimum amount needed to bring a row fully into view.
    pub fn ensure_visible(&mut self, index: usize) -> bool {
        let Some(top) = self.offset_of(index) else {
            return false;
        };
        let bottom = top + self.height_of(index).get();
        if top < self.scroll {
            self.set_scroll(top)
        } else if bottom > self.scroll + self.viewport {
            let target = bottom.saturating_sub(self.viewport).min(top);
            self.set_scroll(target)
        } else {
            false
        }
    }

    fn rebuild_offsets(&mut self) {
        let mut offsets = Vec::with_capacity(self.row_count + 1);
        let mut acc = 0u32;
        offsets.push(acc);
        for i in 0..self.row_count {
            acc += self.height_of(i).get();
            offsets.push(acc);
        }
        self.offsets = offsets;
        self.scroll = self.scroll.min(self.max_scroll());
        self.recompute();
    }

    fn recompute(&mut self) {
        let n = self.row_count;
        let total = self.total_extent();
        let first = self.offsets[1..=n].partition_point(|&bottom| bottom <= self.scroll);
        let view_end = self.scroll + self.viewport;
        let last = self.offsets[..n]
            .partition_point(|&top| top < view_end)
            .max(first);

        let start = first.saturating_sub(self.overscan);
        let end = (last + self.overscan).min(n);
        self.window = VisibleWindow {
            start,
            end,
            spacer_above: self.offsets[start],
            spacer_below: total - self.offsets[end],
            total_extent: total,
            heights: (start..end).map(|i| self.height_of(i)).collect(),
        };
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn list(rows: usize, viewport: u32) -> VirtualList {
        let mut l = VirtualList::new(2, 2);
        l.reset_rows(rows);
        l.set_viewport(viewport);
        l
    }

    fn assert_extent_invariant(l: &VirtualList) {
        let w = l.window();
        assert_eq!(
            w.spacer_above + w.rendered_extent() + w.spacer_below,
            w.total_extent,
            "window {:?}",
            w.indices()
        );
        assert_eq!(w.total_extent, l.total_extent());
    }

    #[test]
    fn empty_list_has_empty_window() {
        let l = list(0, 10);
        assert!(l.window().is_empty());
        assert_eq!(l.total_extent(), 0);
        assert_extent_invariant(&l);
    }

    #[test]
    fn estimated_extent_and_initial_window() {
        let l = list(1000, 10);
        assert_eq!(l.total_extent(), 2000);
        // 5 visible rows + 2 overscan below.
        assert_eq!(l.window().indices(), 0..7);
        assert_eq!(l.window().spacer_above, 0);
        assert_extent_invariant(&l);
    }

    #[test]
    fn overscan_on_both_edges() {
        let mut l = list(1000, 10);
        l.set_scroll(100);
        // Rows 50..55 visible, overscan 2 each side.
        assert_eq!(l.window().indices(), 48..57);
        assert_eq!(l.window().spacer_above, 96);
        assert_extent_invariant(&l);
    }

    #[test]
    fn invariant_holds_for_every_scroll_offset() {
        let mut l = list(60, 7);
        for offset in 0..=l.max_scroll() {
            l.set_scroll(offset);
            assert_extent_invariant(&l);
        }
    }

    #[test]
    fn invariant_holds_with_partial_measurements() {
        let mut l = list(60, 7);
        for i in (0..60).step_by(3) {
            l.measure(i, 1);
        }
        l.measure(10, 5);
        l.measure(59, 4);
        for offset in 0..=l.max_scroll() {
            l.set_scroll(offset);
            assert_extent_invariant(&l);
            let w = l.window();
            assert!(w.heights.iter().enumerate().all(|(k, h)| *h == l.height_of(w.start + k)));
        }
    }

    #[test]
    fn measurement_replaces_estimate() {
        let mut l = list(10, 4);
        assert_eq!(l.height_of(3), RowHeight::Estimated(2));
        assert!(l.measure(3, 1));
        assert_eq!(l.height_of(3), RowHeight::Measured(1));
        assert_eq!(l.total_extent(), 19);
        assert_eq!(l.offset_of(4), Some(7));
        // Same value again: no extent change.
        assert!(!l.measure(3, 1));
        // Matching the estimate still marks it measured.
        assert!(!l.measure(4, 2));
        assert_eq!(l.height_of(4), RowHeight::Measured(2));
    }

    #[test]
    fn measure_out_of_range_is_ignored() {
        let mut l = list(3, 4);
        assert!(!l.measure(3, 9));
        assert_eq!(l.total_extent(), 6);
    }

    #[test]
    fn zero_height_is_clamped() {
        let mut l = list(3, 4);
        l.measure(0, 0);
        assert_eq!(l.height_of(0), RowHeight::Measured(1));
    }

    #[test]
    fn scroll_clamps_to_max() {
        let mut l = list(10, 6);
        assert!(l.set_scroll(10_000));
        assert_eq!(l.scroll(), 14);
        assert!(!l.set_scroll(14));
        assert!(l.scroll_by(-100));
        assert_eq!(l.scroll(), 0);
    }

    #[test]
    fn shrinking_rows_clamps_scroll() {
        let mut l = list(100, 10);
        l.set_scroll(150);
        l.reset_rows(10);
        assert_eq!(l.scroll(), 10);
        assert_eq!(l.window().end, 10);
        assert_extent_invariant(&l);
    }

    #[test]
    fn reset_rows_drops_measurements() {
        let mut l = list(10, 4);
        l.measure(2, 1);
        l.reset_rows(10);
        assert_eq!(l.height_of(2), RowHeight::Estimated(2));
        assert_eq!(l.total_extent(), 20);
    }

    #[test]
    fn viewport_resize_recomputes() {
        let mut l = list(100, 4);
        let before = l.window().end;
        l.set_viewport(20);
        assert!(l.window().end > before);
        assert_extent_invariant(&l);
    }

    #[test]
    fn ensure_visible_scrolls_minimally() {
        let mut l = list(100, 10);
        assert!(!l.ensure_visible(2));
        assert!(l.ensure_visible(10));
        // Row 10 spans 20..22; bottom aligned with viewport end.
        assert_eq!(l.scroll(), 12);
        assert!(l.ensure_visible(3));
        assert_eq!(l.scroll(), 6);
    }

    #[test]
    fn row_at_offset_lookup() {
        let mut l = list(5, 4);
        l.measure(1, 3);
        // Rows: 0..2, 2..5, 5..7, 7..9, 9..11
        assert_eq!(l.row_at_offset(0), Some(0));
        assert_eq!(l.row_at_offset(2), Some(1));
        assert_eq!(l.row_at_offset(4), Some(1));
        assert_eq!(l.row_at_offset(5), Some(2));
        assert_eq!(l.row_at_offset(10), Some(4));
        assert_eq!(l.row_at_offset(11), None);
    }
}
