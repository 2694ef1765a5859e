use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::sync::Arc;

use crate::data::datatable::{DataType, DataValue};
use crate::data::datavalue_compare::compare_datavalues;
use crate::data::text_query::TextQueryMatcher;

pub const MIN_COL_WIDTH: u16 = 3;
pub const MAX_COL_WIDTH: u16 = 50;

/// Maps opaque row data to the typed value of one column
pub type ValueAccessor<T> = Arc<dyn Fn(&T) -> DataValue + Send + Sync>;
/// Total order used when sorting by a column
pub type SortFn = Arc<dyn Fn(&DataValue, &DataValue) -> Ordering + Send + Sync>;
/// Column specific text query matcher: `(query, value) -> matched`
pub type TextQueryFn = Arc<dyn Fn(&str, &DataValue) -> bool + Send + Sync>;
/// Custom cell formatting
pub type FormatFn = Arc<dyn Fn(&DataValue) -> String + Send + Sync>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Pin {
    Left,
}

/// Kind of a column, used to pick its cell renderer once at configuration time
#[derive(Clone)]
pub enum ColumnKind {
    Text,
    Number { precision: Option<usize> },
    Boolean,
    DateTime { format: Option<String> },
    Custom(FormatFn),
}

impl ColumnKind {
    /// Default kind for values of the given type
    pub fn for_type(data_type: &DataType) -> Self {
        match data_type {
            DataType::Integer => ColumnKind::Number { precision: None },
            DataType::Float => ColumnKind::Number { precision: None },
            DataType::Boolean => ColumnKind::Boolean,
            DataType::DateTime => ColumnKind::DateTime { format: None },
            _ => ColumnKind::Text,
        }
    }
}

impl fmt::Debug for ColumnKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnKind::Text => write!(f, "Text"),
            ColumnKind::Number { precision } => write!(f, "Number({:?})", precision),
            ColumnKind::Boolean => write!(f, "Boolean"),
            ColumnKind::DateTime { format } => write!(f, "DateTime({:?})", format),
            ColumnKind::Custom(_) => write!(f, "Custom"),
        }
    }
}

/// Whether and how a column takes part in the free-text query
#[derive(Clone, Default)]
pub enum TextQuery {
    Disabled,
    /// Use the grid wide matcher (substring, regex or fuzzy)
    #[default]
    Default,
    Custom(TextQueryFn),
}

/// A column definition supplied by the embedding application.
///
/// Columns are immutable once handed to the grid. The grid reorders, hides
/// and pins them by `key` only.
pub struct Column<T> {
    pub key: String,
    pub title: String,
    accessor: ValueAccessor<T>,
    pub kind: ColumnKind,
    pub sortable: bool,
    /// Filters and view queries on this column are ignored when false
    pub filterable: bool,
    pub min_width: u16,
    pub max_width: u16,
    pub fill_width: bool,
    pub pin: Option<Pin>,
    sort_fn: Option<SortFn>,
    text_query: TextQuery,
}

impl<T> Column<T> {
    pub fn new<F>(key: impl Into<String>, title: impl Into<String>, accessor: F) -> Self
    where
        F: Fn(&T) -> DataValue + Send + Sync + 'static,
    {
        Self {
            key: key.into(),
            title: title.into(),
            accessor: Arc::new(accessor),
            kind: ColumnKind::Text,
            sortable: true,
            filterable: true,
            min_width: MIN_COL_WIDTH,
            max_width: MAX_COL_WIDTH,
            fill_width: false,
            pin: None,
            sort_fn: None,
            text_query: TextQuery::Default,
        }
    }

    pub fn with_kind(mut self, kind: ColumnKind) -> Self {
        self.kind = kind;
        self
    }

    pub fn with_sortable(mut self, sortable: bool) -> Self {
        self.sortable = sortable;
        self
    }

    pub fn with_filterable(mut self, filterable: bool) -> Self {
        self.filterable = filterable;
        self
    }

    /// Width limits; `max` is raised to `min` when smaller
    pub fn with_width_limits(mut self, min: u16, max: u16) -> Self {
        self.min_width = min;
        self.max_width = max.max(min);
        self
    }

    pub fn with_fill_width(mut self, fill: bool) -> Self {
        self.fill_width = fill;
        self
    }

    pub fn pinned_left(mut self) -> Self {
        self.pin = Some(Pin::Left);
        self
    }

    pub fn with_sort_fn<F>(mut self, sort_fn: F) -> Self
    where
        F: Fn(&DataValue, &DataValue) -> Ordering + Send + Sync + 'static,
    {
        self.sort_fn = Some(Arc::new(sort_fn));
        self
    }

    pub fn with_text_query<F>(mut self, matcher: F) -> Self
    where
        F: Fn(&str, &DataValue) -> bool + Send + Sync + 'static,
    {
        self.text_query = TextQuery::Custom(Arc::new(matcher));
        self
    }

    pub fn without_text_query(mut self) -> Self {
        self.text_query = TextQuery::Disabled;
        self
    }

    /// Read this column's value out of a row's data
    pub fn value(&self, data: &T) -> DataValue {
        (self.accessor)(data)
    }

    /// Compare two values with the column's sort function
    pub fn compare(&self, a: &DataValue, b: &DataValue) -> Ordering {
        match &self.sort_fn {
            Some(sort_fn) => sort_fn(a, b),
            None => compare_datavalues(a, b),
        }
    }

    pub fn is_text_queryable(&self) -> bool {
        !matches!(self.text_query, TextQuery::Disabled)
    }

    /// Whether `value` matches the current text query for this column
    pub fn matches_text(&self, matcher: &TextQueryMatcher, value: &DataValue) -> bool {
        match &self.text_query {
            TextQuery::Disabled => false,
            TextQuery::Default => matcher.is_match(value),
            TextQuery::Custom(f) => f(matcher.query(), value),
        }
    }

    pub fn is_pinned(&self) -> bool {
        self.pin == Some(Pin::Left)
    }
}

impl<T> Clone for Column<T> {
    fn clone(&self) -> Self {
        Self {
            key: self.key.clone(),
            title: self.title.clone(),
            accessor: Arc::clone(&self.accessor),
            kind: self.kind.clone(),
            sortable: self.sortable,
            filterable: self.filterable,
            min_width: self.min_width,
            max_width: self.max_width,
            fill_width: self.fill_width,
            pin: self.pin,
            sort_fn: self.sort_fn.clone(),
            text_query: self.text_query.clone(),
        }
    }
}

impl<T> fmt::Debug for Column<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Column")
            .field("key", &self.key)
            .field("title", &self.title)
            .field("kind", &self.kind)
            .field("sortable", &self.sortable)
            .field("filterable", &self.filterable)
            .field("min_width", &self.min_width)
            .field("max_width", &self.max_width)
            .field("fill_width", &self.fill_width)
            .field("pin", &self.pin)
            .finish()
    }
}

/// Find a column by key
pub fn column_index<T>(columns: &[Column<T>], key: &str) -> Option<usize> {
    columns.iter().position(|c| c.key == key)
}
