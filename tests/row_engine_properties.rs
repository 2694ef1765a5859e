// Sort, filter and text query passes over a generated order book

use datagrid::data::column::{Column, ColumnKind};
use datagrid::data::data_view::{DataView, RowQuery, SortDirection};
use datagrid::data::datatable::{DataValue, Row};
use datagrid::data::filter::{FilterOp, FilterSpec, QueryClause};
use datagrid::data::text_query::{TextQueryMatcher, TextQueryMode};
use serde_json::json;
use std::sync::Arc;

#[derive(Debug, Clone)]
struct Order {
    id: i64,
    customer: String,
    region: &'static str,
    amount: i64,
    note: &'static str,
}

const REGIONS: [&str; 4] = ["north", "south", "east", "west"];

fn orders() -> Arc<Vec<Row<Order>>> {
    Arc::new(
        (0..40)
            .map(|i: i64| {
                Row::new(
                    i,
                    Order {
                        id: i,
                        customer: format!("cust{}", i % 7),
                        region: REGIONS[(i % 4) as usize],
                        amount: (i * 37) % 100,
                        note: if i % 5 == 0 { "rush" } else { "" },
                    },
                )
            })
            .collect(),
    )
}

fn columns() -> Vec<Column<Order>> {
    vec![
        Column::new("id", "Id", |o: &Order| DataValue::Integer(o.id)),
        Column::new("customer", "Customer", |o: &Order| {
            DataValue::String(o.customer.clone())
        }),
        Column::new("region", "Region", |o: &Order| {
            DataValue::String(o.region.to_string())
        }),
        Column::new("amount", "Amount", |o: &Order| DataValue::Integer(o.amount))
            .with_kind(ColumnKind::Number { precision: None }),
        Column::new("note", "Note", |o: &Order| DataValue::String(o.note.to_string())),
    ]
}

fn ids(view: &DataView<Order>) -> Vec<i64> {
    view.rows().iter().map(|r| r.data.id).collect()
}

fn substring(query: &str) -> TextQueryMatcher {
    TextQueryMatcher::new(query, TextQueryMode::Substring, true).unwrap()
}

#[test]
fn test_each_filter_narrows_visible_rows() {
    let cols = columns();
    let filters = vec![
        FilterSpec::new("region", FilterOp::In, Some(json!(["north", "South"]))),
        FilterSpec::new("amount", FilterOp::Gte, Some(json!(20))),
        FilterSpec::new("customer", FilterOp::Neq, Some(json!("cust3"))),
        FilterSpec::new("note", FilterOp::Empty, None),
    ];

    let mut previous = ids(&DataView::new(orders()));
    assert_eq!(previous.len(), 40);

    for k in 0..filters.len() {
        let query = RowQuery {
            filters: &filters[..=k],
            ..Default::default()
        };
        let view = DataView::apply(orders(), &cols, &cols, &query).unwrap();
        let current = ids(&view);
        assert!(current.len() <= previous.len(), "filter {} grew the row set", k);
        assert!(current.iter().all(|id| previous.contains(id)));
        previous = current;
    }

    let source = orders();
    for id in &previous {
        let order = &source[*id as usize].data;
        assert!(order.region == "north" || order.region == "south");
        assert!(order.amount >= 20);
        assert_ne!(order.customer, "cust3");
        assert!(order.note.is_empty());
    }
}

#[test]
fn test_equal_keys_keep_source_order_in_both_directions() {
    let cols = columns();
    for direction in [SortDirection::Asc, SortDirection::Desc] {
        let query = RowQuery {
            sort_index: Some(2),
            sort_direction: direction,
            ..Default::default()
        };
        let view = DataView::apply(orders(), &cols, &cols, &query).unwrap();
        let rows = view.rows();
        for pair in rows.windows(2) {
            let (a, b) = (&pair[0].data, &pair[1].data);
            match direction {
                SortDirection::Asc => assert!(a.region <= b.region),
                SortDirection::Desc => assert!(a.region >= b.region),
            }
            if a.region == b.region {
                assert!(a.id < b.id, "{:?} sort reordered ties", direction);
            }
        }
    }
}

#[test]
fn test_text_query_matches_any_display_column() {
    let all = columns();
    // only id and customer are displayed
    let display: Vec<Column<Order>> = columns().into_iter().take(2).collect();

    let matcher = substring("3");
    let query = RowQuery {
        text_query: Some(&matcher),
        ..Default::default()
    };
    let view = DataView::apply(orders(), &display, &all, &query).unwrap();
    let expected: Vec<i64> = orders()
        .iter()
        .filter(|r| r.data.id.to_string().contains('3') || r.data.customer.contains('3'))
        .map(|r| r.data.id)
        .collect();
    assert_eq!(ids(&view), expected);

    // "rush" only appears in the hidden note column
    let matcher = substring("RUSH");
    let query = RowQuery {
        text_query: Some(&matcher),
        ..Default::default()
    };
    let view = DataView::apply(orders(), &display, &all, &query).unwrap();
    assert!(view.is_empty());
}

#[test]
fn test_sorted_filtered_and_queried_together() {
    let cols = columns();
    let filters = vec![FilterSpec::new("region", FilterOp::Eq, Some(json!("NORTH")))];
    let queries = vec![QueryClause::new("amount", FilterOp::Lt, json!(90))];
    let matcher = substring("cust");
    let query = RowQuery {
        sort_index: Some(3),
        sort_direction: SortDirection::Desc,
        filters: &filters,
        queries: &queries,
        text_query: Some(&matcher),
        case_insensitive: true,
    };
    let view = DataView::apply(orders(), &cols, &cols, &query).unwrap();
    let rows = view.rows();
    assert!(!rows.is_empty());
    assert!(rows.iter().all(|r| r.data.region == "north" && r.data.amount < 90));
    assert!(rows.windows(2).all(|p| p[0].data.amount >= p[1].data.amount));
    assert_eq!(view.sorted_row_indices().len(), 40);
}

#[test]
fn test_case_sensitive_filters() {
    let cols = columns();
    let filters = vec![FilterSpec::new("region", FilterOp::Eq, Some(json!("NORTH")))];
    let query = RowQuery {
        filters: &filters,
        case_insensitive: false,
        ..Default::default()
    };
    let view = DataView::apply(orders(), &cols, &cols, &query).unwrap();
    assert_eq!(view.row_count(), 0);
}

#[test]
fn test_malformed_filter_value_is_error() {
    let cols = columns();
    let filters = vec![FilterSpec::new("region", FilterOp::In, Some(json!("north")))];
    let query = RowQuery {
        filters: &filters,
        ..Default::default()
    };
    let err = DataView::apply(orders(), &cols, &cols, &query).err().unwrap();
    assert!(format!("{:#}", err).contains("region"));
}
