use anyhow::{bail, Context, Result};
use serde_json::Value as JsonValue;
use std::fs::File;
use std::io::BufReader;
use std::path::Path;
use tracing::info;

use crate::data::column::{Column, ColumnKind};
use crate::data::datatable::{DataType, DataValue, Row};

/// Rows are plain value vectors; column `i` reads element `i`
pub type Record = Vec<DataValue>;

/// Rows and derived columns from a file
pub struct LoadedTable {
    pub name: String,
    pub rows: Vec<Row<Record>>,
    pub columns: Vec<Column<Record>>,
}

/// Load a CSV file (first line is the header)
pub fn load_csv(path: impl AsRef<Path>) -> Result<LoadedTable> {
    let path = path.as_ref();
    let mut reader = csv::Reader::from_path(path)
        .with_context(|| format!("Failed to open CSV file {}", path.display()))?;

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.to_string()).collect();

    let mut rows = Vec::new();
    for (idx, record) in reader.records().enumerate() {
        let record = record.with_context(|| format!("Bad CSV record at line {}", idx + 2))?;
        let values: Record = headers
            .iter()
            .enumerate()
            .map(|(i, _)| record.get(i).map(DataValue::infer).unwrap_or(DataValue::Null))
            .collect();
        rows.push(Row::new(idx, values));
    }

    let table = build_table(table_name(path), headers, rows);
    info!(target: "loader", "Loaded {} rows x {} columns from {}",
        table.rows.len(), table.columns.len(), path.display());
    Ok(table)
}

/// Load a JSON file containing an array of objects. Column order follows the
/// keys of the first object, keys only seen later are appended.
pub fn load_json(path: impl AsRef<Path>) -> Result<LoadedTable> {
    let path = path.as_ref();
    let file =
        File::open(path).with_context(|| format!("Failed to open JSON file {}", path.display()))?;
    let json: JsonValue = serde_json::from_reader(BufReader::new(file))
        .with_context(|| format!("Failed to parse JSON file {}", path.display()))?;

    let Some(items) = json.as_array() else {
        bail!("Expected a JSON array of objects in {}", path.display());
    };

    let mut headers: Vec<String> = Vec::new();
    for item in items {
        let Some(obj) = item.as_object() else {
            bail!("Expected a JSON array of objects in {}", path.display());
        };
        for key in obj.keys() {
            if !headers.iter().any(|h| h == key) {
                headers.push(key.clone());
            }
        }
    }

    let rows = items
        .iter()
        .enumerate()
        .map(|(idx, item)| {
            let values: Record = headers
                .iter()
                .map(|h| item.get(h).map(DataValue::from_json).unwrap_or(DataValue::Null))
                .collect();
            Row::new(idx, values)
        })
        .collect();

    let table = build_table(table_name(path), headers, rows);
    info!(target: "loader", "Loaded {} rows x {} columns from {}",
        table.rows.len(), table.columns.len(), path.display());
    Ok(table)
}

/// Load by file extension (`.json`, anything else is read as CSV)
pub fn load_file(path: impl AsRef<Path>) -> Result<LoadedTable> {
    let path = path.as_ref();
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));
    if is_json {
        load_json(path)
    } else {
        load_csv(path)
    }
}

fn table_name(path: &Path) -> String {
    path.file_stem()
        .and_then(|s| s.to_str())
        .unwrap_or("data")
        .to_string()
}

fn build_table(name: String, headers: Vec<String>, rows: Vec<Row<Record>>) -> LoadedTable {
    let columns = headers
        .iter()
        .enumerate()
        .map(|(i, header)| {
            let data_type = rows
                .iter()
                .filter_map(|r| r.data.get(i))
                .fold(DataType::Null, |acc, v| acc.merge(&v.data_type()));
            Column::new(header.clone(), header.clone(), move |r: &Record| {
                r.get(i).cloned().unwrap_or(DataValue::Null)
            })
            .with_kind(ColumnKind::for_type(&data_type))
        })
        .collect();

    LoadedTable {
        name,
        rows,
        columns,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn test_load_csv_infers_kinds() {
        let mut file = tempfile::Builder::new().suffix(".csv").tempfile().unwrap();
        writeln!(file, "id,name,price,active").unwrap();
        writeln!(file, "1,apple,1.5,true").unwrap();
        writeln!(file, "2,pear,2,false").unwrap();

        let table = load_file(file.path()).unwrap();
        assert_eq!(table.rows.len(), 2);
        assert_eq!(table.columns.len(), 4);
        assert!(matches!(table.columns[0].kind, ColumnKind::Number { .. }));
        assert!(matches!(table.columns[1].kind, ColumnKind::Text));
        assert!(matches!(table.columns[2].kind, ColumnKind::Number { .. }));
        assert!(matches!(table.columns[3].kind, ColumnKind::Boolean));
        assert_eq!(
            table.columns[1].value(&table.rows[1].data),
            DataValue::String("pear".to_string())
        );
    }

    #[test]
    fn test_load_json_union_of_keys() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"[{{"a": 1}}, {{"a": 2, "b": "x"}}]"#).unwrap();

        let table = load_file(file.path()).unwrap();
        assert_eq!(table.columns.len(), 2);
        assert_eq!(table.columns[1].key, "b");
        assert_eq!(table.columns[1].value(&table.rows[0].data), DataValue::Null);
    }

    #[test]
    fn test_load_json_rejects_non_array() {
        let mut file = tempfile::Builder::new().suffix(".json").tempfile().unwrap();
        write!(file, r#"{{"a": 1}}"#).unwrap();
        assert!(load_file(file.path()).is_err());
    }
}
