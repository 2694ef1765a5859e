//! Resolve final column widths and positions for a viewport width.

use std::ops::Range;

/// Columns are separated by a single cell
pub const COLUMN_SEPARATOR_WIDTH: u16 = 1;

#[derive(Debug, Clone)]
pub struct ColumnLayoutInput {
    pub key: String,
    pub min_width: u16,
    pub max_width: u16,
    pub fill_width: bool,
    pub pinned: bool,
    /// Published natural width, if measured
    pub natural_width: Option<u16>,
    /// Manual resize delta
    pub delta: i32,
}

/// Width before any manual delta: the measured width, else the minimum
pub fn base_width(natural: Option<u16>, min_width: u16) -> u16 {
    natural.unwrap_or(min_width)
}

/// Base width plus the manual delta, clamped to the column limits
pub fn manual_width(natural: Option<u16>, min_width: u16, max_width: u16, delta: i32) -> u16 {
    let max_width = max_width.max(min_width);
    let base = i32::from(base_width(natural, min_width));
    let manual = (base + delta).clamp(i32::from(min_width), i32::from(max_width));
    u16::try_from(manual).unwrap_or(min_width)
}

/// The larger of the manually resized width and the natural width
pub fn resolve_width(natural: Option<u16>, min_width: u16, max_width: u16, delta: i32) -> u16 {
    manual_width(natural, min_width, max_width, delta).max(natural.unwrap_or(0))
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedColumn {
    pub key: String,
    pub width: u16,
    /// Offset inside the pinned layer or the scrolling layer
    pub offset: u16,
    pub pinned: bool,
}

/// Column geometry for one viewport width
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ColumnLayout {
    /// Pinned columns first, in display order
    pub columns: Vec<ResolvedColumn>,
    /// Width of the sticky pinned layer, separators included
    pub pinned_width: u16,
    /// Total width of the scrolling layer
    pub scroll_width: u16,
}

impl ColumnLayout {
    pub fn pinned(&self) -> impl Iterator<Item = &ResolvedColumn> {
        self.columns.iter().filter(|c| c.pinned)
    }

    pub fn unpinned(&self) -> impl Iterator<Item = &ResolvedColumn> {
        self.columns.iter().filter(|c| !c.pinned)
    }

    pub fn get(&self, key: &str) -> Option<&ResolvedColumn> {
        self.columns.iter().find(|c| c.key == key)
    }

    /// Largest useful horizontal scroll offset for `viewport_width`
    pub fn max_scroll(&self, viewport_width: u16) -> u16 {
        let available = viewport_width.saturating_sub(self.pinned_width);
        self.scroll_width.saturating_sub(available)
    }

    /// Indices (into `columns`) of the unpinned columns intersecting the
    /// scrolled window, widened by `overscan` columns on each side
    pub fn visible_unpinned(&self, scroll_left: u16, viewport_width: u16, overscan: usize) -> Range<usize> {
        let first_unpinned = self.columns.iter().take_while(|c| c.pinned).count();
        let available = viewport_width.saturating_sub(self.pinned_width);
        let window_end = u32::from(scroll_left) + u32::from(available);

        let mut start = None;
        let mut end = first_unpinned;
        for (idx, column) in self.columns.iter().enumerate().skip(first_unpinned) {
            let left = u32::from(column.offset);
            let right = left + u32::from(column.width);
            if right > u32::from(scroll_left) && left < window_end {
                start.get_or_insert(idx);
                end = idx + 1;
            }
        }

        let Some(start) = start else {
            return first_unpinned..first_unpinned;
        };
        let start = start.saturating_sub(overscan).max(first_unpinned);
        let end = (end + overscan).min(self.columns.len());
        start..end
    }
}

/// Lay out columns for `viewport_width`: pinned first, leftover width split
/// evenly across fill columns with the last one taking the remainder.
pub fn resolve_layout(inputs: &[ColumnLayoutInput], viewport_width: u16) -> ColumnLayout {
    let ordered: Vec<&ColumnLayoutInput> = inputs
        .iter()
        .filter(|c| c.pinned)
        .chain(inputs.iter().filter(|c| !c.pinned))
        .collect();

    let mut widths: Vec<u16> = ordered
        .iter()
        .map(|c| resolve_width(c.natural_width, c.min_width, c.max_width, c.delta))
        .collect();

    let separators = u32::try_from(ordered.len().saturating_sub(1)).unwrap_or(0)
        * u32::from(COLUMN_SEPARATOR_WIDTH);
    let used: u32 = widths.iter().map(|w| u32::from(*w)).sum::<u32>() + separators;
    let fill: Vec<usize> = ordered
        .iter()
        .enumerate()
        .filter(|(_, c)| c.fill_width)
        .map(|(i, _)| i)
        .collect();

    if !fill.is_empty() && used < u32::from(viewport_width) {
        let leftover = u32::from(viewport_width) - used;
        let share = leftover / fill.len() as u32;
        let remainder = leftover % fill.len() as u32;
        for (n, &idx) in fill.iter().enumerate() {
            let extra = if n + 1 == fill.len() { share + remainder } else { share };
            widths[idx] = widths[idx].saturating_add(u16::try_from(extra).unwrap_or(u16::MAX));
        }
    }

    let mut layout = ColumnLayout::default();
    let mut pinned_offset: u16 = 0;
    let mut scroll_offset: u16 = 0;
    for (input, width) in ordered.iter().zip(widths) {
        let offset = if input.pinned {
            let offset = pinned_offset;
            pinned_offset = pinned_offset.saturating_add(width + COLUMN_SEPARATOR_WIDTH);
            offset
        } else {
            let offset = scroll_offset;
            scroll_offset = scroll_offset.saturating_add(width + COLUMN_SEPARATOR_WIDTH);
            offset
        };
        layout.columns.push(ResolvedColumn {
            key: input.key.clone(),
            width,
            offset,
            pinned: input.pinned,
        });
    }
    layout.pinned_width = pinned_offset;
    layout.scroll_width = scroll_offset.saturating_sub(COLUMN_SEPARATOR_WIDTH);
    layout
}

#[cfg(test)]
mod tests {
    use super::*;

    fn input(key: &str, natural: u16) -> ColumnLayoutInput {
        ColumnLayoutInput {
            key: key.to_string(),
            min_width: 3,
            max_width: 50,
            fill_width: false,
            pinned: false,
            natural_width: Some(natural),
            delta: 0,
        }
    }

    #[test]
    fn test_resolve_width() {
        // manual delta grows past the natural width
        assert_eq!(resolve_width(Some(10), 3, 50, 5), 15);
        // shrinking below natural keeps natural
        assert_eq!(resolve_width(Some(10), 3, 50, -5), 10);
        // unmeasured column starts from min
        assert_eq!(resolve_width(None, 4, 50, 6), 10);
        // clamped to max
        assert_eq!(resolve_width(Some(10), 3, 20, 100), 20);
    }

    #[test]
    fn test_fill_columns_take_leftover() {
        let mut a = input("a", 10);
        a.fill_width = true;
        let b = input("b", 10);
        let mut c = input("c", 10);
        c.fill_width = true;
        // 30 + 2 separators = 32, leftover 9 => 4 and 5
        let layout = resolve_layout(&[a, b, c], 41);
        let widths: Vec<u16> = layout.columns.iter().map(|c| c.width).collect();
        assert_eq!(widths, vec![14, 10, 15]);
        assert_eq!(layout.scroll_width, 41);
    }

    #[test]
    fn test_pinned_layer() {
        let a = input("a", 10);
        let mut b = input("b", 6);
        b.pinned = true;
        let layout = resolve_layout(&[a, b], 80);
        assert_eq!(layout.columns[0].key, "b");
        assert_eq!(layout.pinned_width, 7);
        assert_eq!(layout.get("a").unwrap().offset, 0);
        assert_eq!(layout.scroll_width, 10);
    }

    #[test]
    fn test_visible_unpinned_window() {
        let inputs: Vec<_> = (0..10).map(|i| input(&format!("c{}", i), 9)).collect();
        // every column takes 10 cells including its separator
        let layout = resolve_layout(&inputs, 30);
        assert_eq!(layout.visible_unpinned(0, 30, 0), 0..3);
        assert_eq!(layout.visible_unpinned(25, 30, 0), 2..6);
        assert_eq!(layout.visible_unpinned(25, 30, 1), 1..7);
        assert_eq!(layout.max_scroll(30), 99 - 30);
    }
}
