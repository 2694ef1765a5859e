use std::collections::{HashMap, VecDeque};
use std::time::Instant;
use tracing::debug;

use crate::data::column::Column;
use crate::data::datatable::Row;
use crate::ui::cell_renderer::{display_width, CellRenderer};
use crate::utils::debouncer::{DebouncedValue, Debouncer};

/// Space around the widest sampled value
pub const COLUMN_PADDING: u16 = 2;

/// Extra header room for the sort/pin/menu affordances
pub const HEADER_AFFORDANCE_WIDTH: u16 = 2;

/// Evenly spread sample of row indices in `[min, max]`.
///
/// Breadth-first bisection: take the midpoint of a range, then queue its left
/// and right remainders. The result is sorted.
pub fn generate_sample_indices(min: usize, max: usize, count: usize) -> Vec<usize> {
    let mut samples = Vec::with_capacity(count);
    if count == 0 || min > max {
        return samples;
    }

    let mut queue = VecDeque::new();
    queue.push_back((min, max));

    while let Some((lo, hi)) = queue.pop_front() {
        if samples.len() >= count {
            break;
        }
        let mid = lo + (hi - lo) / 2;
        samples.push(mid);
        if mid > lo {
            queue.push_back((lo, mid - 1));
        }
        if mid < hi {
            queue.push_back((mid + 1, hi));
        }
    }

    samples.sort_unstable();
    samples
}

/// Sample for a row set of `row_count` rows
pub fn sample_rows(row_count: usize, sample_size: usize) -> Vec<usize> {
    if row_count == 0 {
        return Vec::new();
    }
    generate_sample_indices(0, row_count - 1, row_count.min(sample_size))
}

/// Natural width of a column: header or widest sampled cell, plus padding
pub fn measure_column<T>(
    column: &Column<T>,
    renderer: &dyn CellRenderer,
    rows: &[&Row<T>],
) -> u16 {
    let header = display_width(&column.title).saturating_add(HEADER_AFFORDANCE_WIDTH);
    let widest = rows
        .iter()
        .map(|row| renderer.measure(&column.value(&row.data)))
        .max()
        .unwrap_or(0);
    header.max(widest).saturating_add(COLUMN_PADDING)
}

/// Layout limits used when accepting a measurement
#[derive(Debug, Clone)]
pub struct WidthLimits {
    pub key: String,
    pub min_width: u16,
    pub max_width: u16,
    /// Width the user resized the column to, if any
    pub manual_width: Option<u16>,
}

/// Accepted natural widths, keyed by column
pub type WidthChange = HashMap<String, u16>;

/// Tracks natural column widths.
///
/// Measurements are collected per column and only reconciled once every
/// column of the current window has one. A new width replaces the stored
/// one only when it moves by more than the hysteresis. Accepted changes
/// are published after a quiet period; the very first width of a column is
/// published straight away.
///
/// Only the natural width is published. The layout applies manual deltas
/// on top of it, so the manual floor lives in one place.
pub struct ColumnWidthCalculator {
    hysteresis: u16,
    /// Latest raw measurement per column, not yet reconciled
    measurements: HashMap<String, u16>,
    /// Accepted widths, manual floor included (what the hysteresis compares against)
    accepted: HashMap<String, u16>,
    /// Published clamped measurements, without the manual floor
    naturals: HashMap<String, u16>,
    pending_naturals: HashMap<String, u16>,
    changes: DebouncedValue<WidthChange>,
    remeasure: Debouncer,
}

impl ColumnWidthCalculator {
    pub fn new(hysteresis: u16, debounce_ms: u64, reset_debounce_ms: u64) -> Self {
        Self {
            hysteresis,
            measurements: HashMap::new(),
            accepted: HashMap::new(),
            naturals: HashMap::new(),
            pending_naturals: HashMap::new(),
            changes: DebouncedValue::new(debounce_ms),
            remeasure: Debouncer::new(reset_debounce_ms),
        }
    }

    pub fn record_measurement(&mut self, key: &str, width: u16) {
        self.measurements.insert(key.to_string(), width);
    }

    pub fn has_measurement(&self, key: &str) -> bool {
        self.measurements.contains_key(key)
    }

    /// Reconcile measurements for the columns in `window`.
    ///
    /// Returns the widths accepted by this call (empty when the window is not
    /// fully measured yet or nothing moved past the hysteresis).
    pub fn reconcile_at(&mut self, window: &[WidthLimits], now: Instant) -> WidthChange {
        let mut accepted = WidthChange::new();
        if window.is_empty() || !window.iter().all(|l| self.has_measurement(&l.key)) {
            return accepted;
        }

        let mut batch = WidthChange::new();
        for limits in window {
            let Some(&measured) = self.measurements.get(&limits.key) else {
                continue;
            };
            let max = limits.max_width.max(limits.min_width);
            let natural = measured.clamp(limits.min_width, max);
            let width = limits.manual_width.map_or(natural, |manual| natural.max(manual));

            match self.accepted.get(&limits.key) {
                Some(&previous) if previous.abs_diff(width) <= self.hysteresis => continue,
                Some(_) => {
                    debug!(target: "column_width", "width of '{}' -> {}", limits.key, width);
                    batch.insert(limits.key.clone(), width);
                    self.pending_naturals.insert(limits.key.clone(), natural);
                }
                None => {
                    self.naturals.insert(limits.key.clone(), natural);
                }
            }
            self.accepted.insert(limits.key.clone(), width);
            accepted.insert(limits.key.clone(), width);
        }

        if !batch.is_empty() {
            let mut pending = self.changes.pending().cloned().unwrap_or_default();
            pending.extend(batch);
            self.changes.push_at(pending, now);
        }

        accepted
    }

    /// Width changes whose quiet period has elapsed
    pub fn take_ready_at(&mut self, now: Instant) -> Option<WidthChange> {
        let change = self.changes.take_ready_at(now)?;
        self.naturals.extend(self.pending_naturals.drain());
        debug!(target: "column_width", "publishing {} width changes", change.len());
        Some(change)
    }

    pub fn has_pending_changes(&self) -> bool {
        self.changes.is_pending()
    }

    /// Published measured width without the manual floor. Manual deltas
    /// are applied on top of this one by the layout.
    pub fn natural_width(&self, key: &str) -> Option<u16> {
        self.naturals.get(key).copied()
    }

    /// Ask for a fresh measurement pass after the reset delay
    pub fn request_remeasure_at(&mut self, now: Instant) {
        self.remeasure.trigger_at(now);
    }

    /// True once the reset delay has elapsed; raw measurements are dropped
    /// so the next pass measures every column again
    pub fn remeasure_due_at(&mut self, now: Instant) -> bool {
        if self.remeasure.should_execute_at(now) {
            self.measurements.clear();
            true
        } else {
            false
        }
    }

    /// Forget raw measurements (columns or rows changed)
    pub fn invalidate(&mut self) {
        self.measurements.clear();
    }

    /// Forget everything, including published widths
    pub fn reset(&mut self) {
        self.measurements.clear();
        self.accepted.clear();
        self.naturals.clear();
        self.pending_naturals.clear();
        self.changes.cancel();
        self.remeasure.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::datatable::DataValue;
    use crate::ui::cell_renderer::TextRenderer;
    use std::time::Duration;

    fn limits(key: &str) -> WidthLimits {
        WidthLimits {
            key: key.to_string(),
            min_width: 3,
            max_width: 500,
            manual_width: None,
        }
    }

    #[test]
    fn test_sample_small_sets_take_everything() {
        assert_eq!(sample_rows(1, 20), vec![0]);
        assert_eq!(sample_rows(5, 20), vec![0, 1, 2, 3, 4]);
        assert_eq!(sample_rows(20, 20), (0..20).collect::<Vec<_>>());
        assert!(sample_rows(0, 20).is_empty());
    }

    #[test]
    fn test_sample_is_spread() {
        let samples = sample_rows(1000, 20);
        assert_eq!(samples.len(), 20);
        assert!(samples[0] < 250);
        assert!(samples[19] > 750);
        assert!(samples.contains(&499));
    }

    #[test]
    fn test_measure_uses_header_and_cells() {
        let column = Column::new("name", "Name", |v: &String| DataValue::String(v.clone()));
        let a = Row::new(0i64, "short".to_string());
        let b = Row::new(1i64, "a much longer value".to_string());
        let width = measure_column(&column, &TextRenderer, &[&a, &b]);
        assert_eq!(width, 19 + COLUMN_PADDING);

        let empty: Vec<&Row<String>> = Vec::new();
        assert_eq!(
            measure_column(&column, &TextRenderer, &empty),
            4 + HEADER_AFFORDANCE_WIDTH + COLUMN_PADDING
        );
    }

    #[test]
    fn test_hysteresis() {
        let start = Instant::now();
        let mut calc = ColumnWidthCalculator::new(5, 200, 10);
        calc.record_measurement("a", 100);
        calc.reconcile_at(&[limits("a")], start);
        assert_eq!(calc.natural_width("a"), Some(100));
        assert!(!calc.has_pending_changes());

        calc.record_measurement("a", 103);
        assert!(calc.reconcile_at(&[limits("a")], start).is_empty());
        assert!(!calc.has_pending_changes());

        calc.record_measurement("a", 107);
        let changed = calc.reconcile_at(&[limits("a")], start);
        assert_eq!(changed.get("a"), Some(&107));
        assert!(calc.has_pending_changes());
    }

    #[test]
    fn test_waits_for_whole_window() {
        let now = Instant::now();
        let mut calc = ColumnWidthCalculator::new(5, 200, 10);
        calc.record_measurement("a", 10);
        assert!(calc.reconcile_at(&[limits("a"), limits("b")], now).is_empty());
        assert_eq!(calc.natural_width("a"), None);

        calc.record_measurement("b", 12);
        assert_eq!(calc.reconcile_at(&[limits("a"), limits("b")], now).len(), 2);
    }

    #[test]
    fn test_clamp_and_manual_floor() {
        let now = Instant::now();
        let mut calc = ColumnWidthCalculator::new(5, 200, 10);
        let mut narrow = limits("a");
        narrow.max_width = 20;
        calc.record_measurement("a", 60);
        calc.reconcile_at(&[narrow.clone()], now);
        assert_eq!(calc.natural_width("a"), Some(20));

        let mut manual = limits("b");
        manual.manual_width = Some(30);
        calc.record_measurement("b", 8);
        let accepted = calc.reconcile_at(&[manual.clone()], now);
        assert_eq!(accepted.get("b"), Some(&30));
        assert_eq!(calc.natural_width("b"), Some(8));

        // natural growth below the manual width stays inside the hysteresis
        calc.record_measurement("b", 12);
        assert!(calc.reconcile_at(&[manual], now).is_empty());
        assert_eq!(calc.natural_width("b"), Some(8));
    }

    #[test]
    fn test_changes_are_debounced() {
        let start = Instant::now();
        let mut calc = ColumnWidthCalculator::new(5, 200, 10);
        calc.record_measurement("a", 10);
        calc.reconcile_at(&[limits("a")], start);

        calc.record_measurement("a", 30);
        calc.reconcile_at(&[limits("a")], start);
        assert_eq!(calc.natural_width("a"), Some(10));
        assert!(calc.take_ready_at(start + Duration::from_millis(100)).is_none());

        let change = calc.take_ready_at(start + Duration::from_millis(200)).unwrap();
        assert_eq!(change.get("a"), Some(&30));
        assert_eq!(calc.natural_width("a"), Some(30));
    }

    #[test]
    fn test_remeasure_after_reset_delay() {
        let start = Instant::now();
        let mut calc = ColumnWidthCalculator::new(5, 200, 10);
        calc.record_measurement("a", 10);
        calc.request_remeasure_at(start);
        assert!(!calc.remeasure_due_at(start + Duration::from_millis(5)));
        assert!(calc.remeasure_due_at(start + Duration::from_millis(10)));
        assert!(!calc.has_measurement("a"));
    }
}
