//! Row and column model, filtering and sorting
//!
//! Rows are opaque to the grid; columns read typed values out of them.
//! `DataView` runs the sort, filter and text query passes that decide which
//! rows are visible.

pub mod column;
pub mod data_view;
pub mod datatable;
pub mod datavalue_compare;
pub mod filter;
pub mod loaders;
pub mod text_query;
