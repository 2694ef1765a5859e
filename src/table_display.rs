use comfy_table::{Attribute, Cell, CellAlignment, ContentArrangement, Table};
use crossterm::style::Stylize;

use datagrid::data::column::ColumnKind;
use datagrid::data::datatable::DataValue;
use datagrid::data::loaders::Record;
use datagrid::ui::grid::DataGrid;

/// Print the grid's visible rows and display columns
pub fn print_grid(grid: &DataGrid<Record>) {
    let rows = grid.get_rows();
    if rows.is_empty() {
        println!("{}", "No rows match.".yellow());
        return;
    }

    let columns: Vec<_> = grid
        .display_column_keys()
        .iter()
        .filter_map(|key| grid.column(key))
        .collect();

    let mut table = Table::new();
    table.set_content_arrangement(ContentArrangement::Dynamic);
    table.set_header(
        columns
            .iter()
            .map(|c| Cell::new(&c.title).add_attribute(Attribute::Bold)),
    );

    for row in &rows {
        table.add_row(columns.iter().map(|column| {
            let value = column.value(&row.data);
            let text = match &value {
                DataValue::Null => String::new(),
                other => other.to_string(),
            };
            let cell = Cell::new(text);
            if matches!(column.kind, ColumnKind::Number { .. }) {
                cell.set_alignment(CellAlignment::Right)
            } else {
                cell
            }
        }));
    }

    println!("{table}");
    println!(
        "\n{}",
        format!("{} of {} rows", rows.len(), grid.data_view().source().len()).green()
    );
}
