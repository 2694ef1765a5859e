//! User interface layer
//!
//! `DataGrid` is the controller that turns store state and rows into a
//! `GridFrame`; `GridWidget` paints it and `GridApp` drives it from the
//! terminal.

pub mod app;
pub mod cell_renderer;
pub mod column_resize;
pub mod frame;
pub mod grid;
pub mod grid_widget;
pub mod header;
pub mod toast;
pub mod transfer;
pub mod view_editor;
pub mod viewport;
pub mod viewport_manager;
