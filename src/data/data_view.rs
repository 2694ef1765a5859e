use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::debug;

use crate::data::column::{column_index, Column};
use crate::data::datatable::{DataValue, Row, RowId};
use crate::data::filter::{FilterOp, FilterSpec, QueryClause};
use crate::data::text_query::TextQueryMatcher;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn toggle(&self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }

    pub fn is_ascending(&self) -> bool {
        matches!(self, SortDirection::Asc)
    }
}

/// Everything the engine needs to derive the visible rows
#[derive(Clone, Copy)]
pub struct RowQuery<'a> {
    /// Index into the display columns; out of range disables sorting
    pub sort_index: Option<usize>,
    pub sort_direction: SortDirection,
    pub filters: &'a [FilterSpec],
    pub queries: &'a [QueryClause],
    pub text_query: Option<&'a TextQueryMatcher>,
    pub case_insensitive: bool,
}

impl Default for RowQuery<'_> {
    fn default() -> Self {
        Self {
            sort_index: None,
            sort_direction: SortDirection::Asc,
            filters: &[],
            queries: &[],
            text_query: None,
            case_insensitive: true,
        }
    }
}

/// A view over the row set that filters and sorts without touching the rows.
///
/// `visible_rows` is the single source of truth for rendering and for the
/// included-rows notification.
pub struct DataView<T> {
    /// The underlying immutable rows
    source: Arc<Vec<Row<T>>>,

    /// All row indices in sort order
    sorted_rows: Vec<usize>,

    /// Row indices that survive filtering, in sort order
    visible_rows: Vec<usize>,
}

impl<T> Clone for DataView<T> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            sorted_rows: self.sorted_rows.clone(),
            visible_rows: self.visible_rows.clone(),
        }
    }
}

impl<T> DataView<T> {
    /// Create a new view showing all rows in their original order
    pub fn new(source: Arc<Vec<Row<T>>>) -> Self {
        let all: Vec<usize> = (0..source.len()).collect();
        Self {
            source,
            sorted_rows: all.clone(),
            visible_rows: all,
        }
    }

    /// Build a view by running sort, filter and text query passes.
    ///
    /// `columns` are the display columns (after selection and pinning) and
    /// are used for sorting and the text query. `raw_columns` is the full
    /// column list, used to resolve filter targets so that filters on hidden
    /// columns still apply.
    pub fn apply(
        source: Arc<Vec<Row<T>>>,
        columns: &[Column<T>],
        raw_columns: &[Column<T>],
        query: &RowQuery<'_>,
    ) -> Result<Self> {
        let sorted_rows = sorted_indices(&source, columns, query.sort_index, query.sort_direction);
        let mask = filtered_mask(&source, columns, raw_columns, query)?;

        let visible_rows: Vec<usize> = sorted_rows
            .iter()
            .copied()
            .filter(|&idx| mask[idx])
            .collect();

        debug!(target: "data_view",
            "DataView::apply - {} rows, {} visible, sort_index={:?} {:?}",
            source.len(), visible_rows.len(), query.sort_index, query.sort_direction);

        Ok(Self {
            source,
            sorted_rows,
            visible_rows,
        })
    }

    /// Get the number of visible rows
    pub fn row_count(&self) -> usize {
        self.visible_rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.visible_rows.is_empty()
    }

    /// Get a visible row by display position
    pub fn get_row(&self, index: usize) -> Option<&Row<T>> {
        let row_idx = *self.visible_rows.get(index)?;
        self.source.get(row_idx)
    }

    /// Get all visible rows in display order
    pub fn rows(&self) -> Vec<&Row<T>> {
        self.visible_rows
            .iter()
            .filter_map(|&idx| self.source.get(idx))
            .collect()
    }

    /// Ids of the visible rows in display order
    pub fn row_ids(&self) -> Vec<RowId> {
        self.rows().into_iter().map(|r| r.id.clone()).collect()
    }

    /// Display position of a row id, if visible
    pub fn position_of(&self, id: &RowId) -> Option<usize> {
        self.visible_rows
            .iter()
            .position(|&idx| self.source.get(idx).is_some_and(|r| &r.id == id))
    }

    /// Get the source rows
    pub fn source(&self) -> &Arc<Vec<Row<T>>> {
        &self.source
    }

    /// Get visible row indices into the source
    pub fn visible_row_indices(&self) -> &[usize] {
        &self.visible_rows
    }

    /// Get all row indices in sort order, before filtering
    pub fn sorted_row_indices(&self) -> &[usize] {
        &self.sorted_rows
    }
}

/// Stable sort of row indices by one display column.
///
/// Returns the identity permutation when no valid sort column is given.
pub fn sorted_indices<T>(
    rows: &[Row<T>],
    columns: &[Column<T>],
    sort_index: Option<usize>,
    direction: SortDirection,
) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..rows.len()).collect();

    let Some(column) = sort_index.and_then(|i| columns.get(i)) else {
        if sort_index.is_some() {
            debug!(target: "data_view", "sort index {:?} out of range, sorting disabled", sort_index);
        }
        return indices;
    };

    let values: Vec<DataValue> = rows.iter().map(|r| column.value(&r.data)).collect();

    // slice::sort_by is stable, equal keys keep their original order
    match direction {
        SortDirection::Asc => indices.sort_by(|&a, &b| column.compare(&values[a], &values[b])),
        SortDirection::Desc => indices.sort_by(|&a, &b| column.compare(&values[b], &values[a])),
    }

    indices
}

/// Membership mask of rows surviving the categorical filters, the view
/// queries and the text query.
pub fn filtered_mask<T>(
    rows: &[Row<T>],
    columns: &[Column<T>],
    raw_columns: &[Column<T>],
    query: &RowQuery<'_>,
) -> Result<Vec<bool>> {
    let mut mask = vec![true; rows.len()];

    let clause_filters: Vec<FilterSpec> = query.queries.iter().map(QueryClause::as_filter).collect();

    for filter in query.filters.iter().chain(clause_filters.iter()) {
        if !filter.is_active() {
            continue;
        }
        let (Some(property), Some(op)) = (&filter.property, &filter.op) else {
            continue;
        };

        let Some(col_idx) = column_index(raw_columns, property) else {
            debug!(target: "data_view", "filter on unknown column '{}' skipped", property);
            continue;
        };
        let column = &raw_columns[col_idx];
        if !column.filterable {
            debug!(target: "data_view", "filter on non-filterable column '{}' skipped", property);
            continue;
        }

        let op: FilterOp = op
            .parse()
            .with_context(|| format!("Invalid filter on column '{}'", property))?;
        let predicate = op
            .build_filter(filter.value.as_ref(), query.case_insensitive)
            .with_context(|| format!("Invalid filter on column '{}'", property))?;

        for (idx, row) in rows.iter().enumerate() {
            if mask[idx] && !predicate(&column.value(&row.data)) {
                mask[idx] = false;
            }
        }
    }

    if let Some(matcher) = query.text_query.filter(|m| !m.is_empty()) {
        let queryable: Vec<&Column<T>> = columns.iter().filter(|c| c.is_text_queryable()).collect();
        for (idx, row) in rows.iter().enumerate() {
            if !mask[idx] {
                continue;
            }
            let any_match = queryable
                .iter()
                .any(|c| c.matches_text(matcher, &c.value(&row.data)));
            if !any_match {
                mask[idx] = false;
            }
        }
    }

    Ok(mask)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::text_query::TextQueryMode;
    use serde_json::json;

    #[derive(Debug, Clone)]
    struct Item {
        name: String,
        group: i64,
    }

    fn rows() -> Arc<Vec<Row<Item>>> {
        let data = [("d", 2), ("a", 1), ("c", 2), ("b", 1)];
        Arc::new(
            data.iter()
                .enumerate()
                .map(|(i, (name, group))| {
                    Row::new(
                        i,
                        Item {
                            name: name.to_string(),
                            group: *group,
                        },
                    )
                })
                .collect(),
        )
    }

    fn columns() -> Vec<Column<Item>> {
        vec![
            Column::new("name", "Name", |i: &Item| DataValue::String(i.name.clone())),
            Column::new("group", "Group", |i: &Item| DataValue::Integer(i.group)),
        ]
    }

    #[test]
    fn test_new_view_shows_all_rows() {
        let view = DataView::new(rows());
        assert_eq!(view.row_count(), 4);
        assert_eq!(view.visible_row_indices(), &[0, 1, 2, 3]);
    }

    #[test]
    fn test_sort_is_stable() {
        let cols = columns();
        let sorted = sorted_indices(&rows(), &cols, Some(1), SortDirection::Asc);
        // group 1 rows (1, 3) keep order, then group 2 rows (0, 2)
        assert_eq!(sorted, vec![1, 3, 0, 2]);

        let sorted = sorted_indices(&rows(), &cols, Some(1), SortDirection::Desc);
        assert_eq!(sorted, vec![0, 2, 1, 3]);
    }

    #[test]
    fn test_out_of_range_sort_disables_sorting() {
        let cols = columns();
        let sorted = sorted_indices(&rows(), &cols, Some(9), SortDirection::Asc);
        assert_eq!(sorted, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_filter_on_hidden_column_applies() {
        let raw = columns();
        let display = vec![raw[0].clone()];
        let filters = vec![FilterSpec::new("group", FilterOp::Eq, Some(json!(2)))];
        let query = RowQuery {
            sort_index: Some(0),
            filters: &filters,
            ..Default::default()
        };
        let view = DataView::apply(rows(), &display, &raw, &query).unwrap();
        // names "c" and "d", sorted by name
        assert_eq!(view.visible_row_indices(), &[2, 0]);
    }

    #[test]
    fn test_unknown_column_filter_is_skipped() {
        let cols = columns();
        let filters = vec![FilterSpec::new("missing", FilterOp::Eq, Some(json!(2)))];
        let query = RowQuery {
            filters: &filters,
            ..Default::default()
        };
        let view = DataView::apply(rows(), &cols, &cols, &query).unwrap();
        assert_eq!(view.row_count(), 4);
    }

    #[test]
    fn test_filter_on_non_filterable_column_is_skipped() {
        let mut cols = columns();
        cols[1] = cols[1].clone().with_filterable(false);
        let filters = vec![FilterSpec::new("group", FilterOp::Eq, Some(json!(2)))];
        let queries = vec![QueryClause::new("group", FilterOp::Eq, json!(1))];
        let query = RowQuery {
            filters: &filters,
            queries: &queries,
            ..Default::default()
        };
        let view = DataView::apply(rows(), &cols, &cols, &query).unwrap();
        assert_eq!(view.row_count(), 4);

        // the name column is still filterable
        let filters = vec![FilterSpec::new("name", FilterOp::Eq, Some(json!("a")))];
        let query = RowQuery {
            filters: &filters,
            ..Default::default()
        };
        let view = DataView::apply(rows(), &cols, &cols, &query).unwrap();
        assert_eq!(view.row_ids(), vec![RowId::Number(1)]);
    }

    #[test]
    fn test_unknown_operator_is_error() {
        let cols = columns();
        let filters = vec![FilterSpec {
            disable: false,
            property: Some("group".to_string()),
            op: Some("between".to_string()),
            value: Some(json!(1)),
        }];
        let query = RowQuery {
            filters: &filters,
            ..Default::default()
        };
        let result = DataView::apply(rows(), &cols, &cols, &query);
        assert!(result.is_err());
    }

    #[test]
    fn test_disabled_filter_ignored() {
        let cols = columns();
        let filters = vec![FilterSpec::new("group", FilterOp::Eq, Some(json!(2))).disabled()];
        let query = RowQuery {
            filters: &filters,
            ..Default::default()
        };
        let view = DataView::apply(rows(), &cols, &cols, &query).unwrap();
        assert_eq!(view.row_count(), 4);
    }

    #[test]
    fn test_queries_and_text_query_compose() {
        let cols = columns();
        let queries = vec![QueryClause::new("group", FilterOp::Eq, json!(1))];
        let matcher = TextQueryMatcher::new("b", TextQueryMode::Substring, true).unwrap();
        let query = RowQuery {
            queries: &queries,
            text_query: Some(&matcher),
            ..Default::default()
        };
        let view = DataView::apply(rows(), &cols, &cols, &query).unwrap();
        assert_eq!(view.row_ids(), vec![RowId::Number(3)]);
        assert_eq!(view.position_of(&RowId::Number(3)), Some(0));
        assert_eq!(view.position_of(&RowId::Number(1)), None);
    }
}
