//! Table query resolver.
//!
//! Console list views render as `<table>` elements whose `th` headers carry
//! `data-testid` column names. [`query_table`] finds body rows by the text
//! of one column and returns cells of another, or whole rows.
//!
//! An unresolvable column yields an empty result, never an error. A table
//! that has not finished rendering looks the same as one with zero matches,
//! so callers that expect rows wrap the query in [`crate::retry`].

use crate::driver::ElementHandle;
use crate::locator::{Locator, Selector, TEST_ID_ATTRIBUTE};
use crate::result::HarnessResult;
use crate::wait::Waiter;
use std::fmt;

/// Reference to a table column by header name or by position
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnRef {
    /// Header `data-testid`; falls back to a numeric position when no header
    /// has this name and the token parses as one
    Name(String),
    /// Zero-based position
    Index(usize),
}

impl ColumnRef {
    /// Resolve against a header row. `None` when unresolvable or out of range.
    #[must_use]
    pub fn resolve(&self, headers: &[Option<String>]) -> Option<usize> {
        match self {
            Self::Name(name) => headers
                .iter()
                .position(|h| h.as_deref() == Some(name.as_str()))
                .or_else(|| name.parse::<usize>().ok().filter(|&i| i < headers.len())),
            Self::Index(index) => Some(*index).filter(|&i| i < headers.len()),
        }
    }
}

impl fmt::Display for ColumnRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Name(name) => f.write_str(name),
            Self::Index(index) => write!(f, "#{index}"),
        }
    }
}

impl From<&str> for ColumnRef {
    fn from(name: &str) -> Self {
        Self::Name(name.to_string())
    }
}

impl From<String> for ColumnRef {
    fn from(name: String) -> Self {
        Self::Name(name)
    }
}

impl From<usize> for ColumnRef {
    fn from(index: usize) -> Self {
        Self::Index(index)
    }
}

/// Header names plus body rows of a rendered table
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TableSnapshot {
    /// Table element
    pub table: ElementHandle,
    /// Header `data-testid` per column, `None` where the attribute is missing
    pub headers: Vec<Option<String>>,
    /// Body rows as (row handle, cell handles)
    pub rows: Vec<(ElementHandle, Vec<ElementHandle>)>,
}

impl TableSnapshot {
    /// Position of a column, if resolvable
    #[must_use]
    pub fn resolve_column(&self, column: &ColumnRef) -> Option<usize> {
        column.resolve(&self.headers)
    }
}

/// Read headers of a table element. Missing `thead` yields no headers.
async fn read_headers(
    waiter: &Waiter<'_>,
    table: &ElementHandle,
) -> HarnessResult<Vec<Option<String>>> {
    let driver = waiter.driver();
    let Some(thead) = driver
        .find_all(Some(table), &Selector::tag("thead"))
        .await?
        .into_iter()
        .next()
    else {
        return Ok(Vec::new());
    };
    let mut headers = Vec::new();
    for th in driver.find_all(Some(&thead), &Selector::tag("th")).await? {
        headers.push(driver.attribute(&th, TEST_ID_ATTRIBUTE).await?);
    }
    Ok(headers)
}

/// Body rows of a table element with their `td` cells
async fn read_rows(
    waiter: &Waiter<'_>,
    table: &ElementHandle,
) -> HarnessResult<Vec<(ElementHandle, Vec<ElementHandle>)>> {
    let driver = waiter.driver();
    let Some(tbody) = driver
        .find_all(Some(table), &Selector::tag("tbody"))
        .await?
        .into_iter()
        .next()
    else {
        return Ok(Vec::new());
    };
    let mut rows = Vec::new();
    for row in driver.find_all(Some(&tbody), &Selector::tag("tr")).await? {
        let cells = driver.find_all(Some(&row), &Selector::tag("td")).await?;
        rows.push((row, cells));
    }
    Ok(rows)
}

/// Wait for the table to be present and capture its structure
pub async fn read_table(waiter: &Waiter<'_>, table: &Locator) -> HarnessResult<TableSnapshot> {
    let table = waiter.wait_present(table).await?;
    let headers = read_headers(waiter, &table).await?;
    let rows = read_rows(waiter, &table).await?;
    Ok(TableSnapshot {
        table,
        headers,
        rows,
    })
}

/// Find table cells (or rows) by column value.
///
/// - `search_column` `None`: every row is a candidate
/// - `search_value` `None`: wildcard, any cell text matches
/// - `result_column` `None`: the row handle is returned instead of a cell
///
/// Rows too short to hold every resolved column are skipped. Cell text must
/// equal `search_value` exactly.
pub async fn query_table(
    waiter: &Waiter<'_>,
    table: &Locator,
    search_column: Option<ColumnRef>,
    search_value: Option<&str>,
    result_column: Option<ColumnRef>,
) -> HarnessResult<Vec<ElementHandle>> {
    let table = waiter.wait_present(table).await?;
    let headers = read_headers(waiter, &table).await?;

    let search = match &search_column {
        Some(column) => match column.resolve(&headers) {
            Some(index) => Some(index),
            None => return Ok(Vec::new()),
        },
        None => None,
    };
    let result = match &result_column {
        Some(column) => match column.resolve(&headers) {
            Some(index) => Some(index),
            None => return Ok(Vec::new()),
        },
        None => None,
    };

    let driver = waiter.driver();
    let mut matches = Vec::new();
    for (row, mut cells) in read_rows(waiter, &table).await? {
        let needed = search.max(result).map_or(0, |i| i + 1);
        if cells.len() < needed {
            continue;
        }
        if let (Some(index), Some(value)) = (search, search_value) {
            if driver.text(&cells[index]).await? != value {
                continue;
            }
        }
        matches.push(match result {
            Some(index) => cells.swap_remove(index),
            None => row,
        });
    }
    Ok(matches)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::locator::WaitOptions;
    use crate::mock::{MockDriver, MockElement};
    use crate::UiDriver;
    use proptest::prelude::*;

    fn row(values: &[&str]) -> Vec<String> {
        values.iter().map(|v| (*v).to_string()).collect()
    }

    fn fast() -> WaitOptions {
        WaitOptions::new().with_timeout(100).with_poll_interval(5)
    }

    fn state_table() -> MockDriver {
        let driver = MockDriver::new();
        driver.mount(MockElement::table(
            "list_resource__table",
            &["name", "state"],
            vec![row(&["a", "Ready"]), row(&["b", "Pending"])],
        ));
        driver
    }

    async fn texts(driver: &MockDriver, handles: &[ElementHandle]) -> Vec<String> {
        let mut out = Vec::new();
        for handle in handles {
            out.push(driver.text(handle).await.unwrap());
        }
        out
    }

    mod column_ref_tests {
        use super::*;

        fn headers(names: &[&str]) -> Vec<Option<String>> {
            names.iter().map(|n| Some((*n).to_string())).collect()
        }

        #[test]
        fn test_name_match_wins_over_numeric_parse() {
            let h = headers(&["1", "0"]);
            assert_eq!(ColumnRef::from("1").resolve(&h), Some(0));
            assert_eq!(ColumnRef::from("0").resolve(&h), Some(1));
        }

        #[test]
        fn test_numeric_fallback_in_range() {
            let h = headers(&["name", "state"]);
            assert_eq!(ColumnRef::from("1").resolve(&h), Some(1));
            assert_eq!(ColumnRef::from("2").resolve(&h), None);
            assert_eq!(ColumnRef::from("-1").resolve(&h), None);
            assert_eq!(ColumnRef::from(1usize).resolve(&h), Some(1));
            assert_eq!(ColumnRef::from(5usize).resolve(&h), None);
        }

        #[test]
        fn test_missing_header_names_never_match() {
            let h = vec![None, Some("state".to_string())];
            assert_eq!(ColumnRef::from("state").resolve(&h), Some(1));
            assert_eq!(ColumnRef::from("bogus").resolve(&h), None);
        }
    }

    mod query_tests {
        use super::*;

        #[tokio::test]
        async fn test_search_by_name_returns_state_cell() {
            let driver = state_table();
            let waiter = Waiter::with_options(&driver, fast());
            let cells = query_table(
                &waiter,
                &"list_resource__table".into(),
                Some("name".into()),
                Some("a"),
                Some("state".into()),
            )
            .await
            .unwrap();
            assert_eq!(texts(&driver, &cells).await, vec!["Ready"]);
        }

        #[tokio::test]
        async fn test_missing_result_column_returns_row() {
            let driver = state_table();
            let waiter = Waiter::with_options(&driver, fast());
            let rows = query_table(
                &waiter,
                &"list_resource__table".into(),
                Some("state".into()),
                Some("Pending"),
                None,
            )
            .await
            .unwrap();
            assert_eq!(rows.len(), 1);
            assert_eq!(rows[0].tag_name, "tr");
            assert_eq!(driver.text(&rows[0]).await.unwrap(), "b Pending");
        }

        #[tokio::test]
        async fn test_unknown_column_is_empty() {
            let driver = state_table();
            let waiter = Waiter::with_options(&driver, fast());
            let cells = query_table(
                &waiter,
                &"list_resource__table".into(),
                Some("bogus".into()),
                Some("a"),
                Some("state".into()),
            )
            .await
            .unwrap();
            assert!(cells.is_empty());
        }

        #[tokio::test]
        async fn test_wildcard_value_returns_every_row() {
            let driver = state_table();
            let waiter = Waiter::with_options(&driver, fast());
            let names = query_table(
                &waiter,
                &"list_resource__table".into(),
                Some("state".into()),
                None,
                Some("name".into()),
            )
            .await
            .unwrap();
            assert_eq!(texts(&driver, &names).await, vec!["a", "b"]);
        }

        #[tokio::test]
        async fn test_value_match_is_exact() {
            let driver = state_table();
            let waiter = Waiter::with_options(&driver, fast());
            let cells = query_table(
                &waiter,
                &"list_resource__table".into(),
                Some("state".into()),
                Some("ready"),
                Some(0usize.into()),
            )
            .await
            .unwrap();
            assert!(cells.is_empty());
        }

        #[tokio::test]
        async fn test_short_rows_are_skipped() {
            let driver = MockDriver::new();
            driver.mount(MockElement::table(
                "t",
                &["name", "state"],
                vec![row(&["a", "Ready"]), row(&["loading"])],
            ));
            let waiter = Waiter::with_options(&driver, fast());
            let rows = query_table(&waiter, &"t".into(), None, None, Some("state".into()))
                .await
                .unwrap();
            assert_eq!(rows.len(), 1);
        }

        #[tokio::test]
        async fn test_hidden_table_still_queried() {
            let driver = MockDriver::new();
            driver.mount(
                MockElement::new("div")
                    .hidden()
                    .child(MockElement::table("t", &["name"], vec![row(&["x"])])),
            );
            let waiter = Waiter::with_options(&driver, fast());
            let rows = query_table(&waiter, &"t".into(), None, None, None)
                .await
                .unwrap();
            assert_eq!(rows.len(), 1);
        }

        #[tokio::test]
        async fn test_absent_table_is_not_found() {
            let driver = MockDriver::new();
            let waiter = Waiter::with_options(&driver, fast());
            let err = query_table(&waiter, &"t".into(), None, None, None)
                .await
                .unwrap_err();
            assert!(matches!(err, crate::HarnessError::NotFound { .. }));
        }

        #[tokio::test]
        async fn test_snapshot_structure() {
            let driver = state_table();
            let waiter = Waiter::with_options(&driver, fast());
            let snapshot = read_table(&waiter, &"list_resource__table".into())
                .await
                .unwrap();
            assert_eq!(
                snapshot.headers,
                vec![Some("name".to_string()), Some("state".to_string())]
            );
            assert_eq!(snapshot.rows.len(), 2);
            assert!(snapshot.rows.iter().all(|(_, cells)| cells.len() == 2));
            assert_eq!(snapshot.resolve_column(&"state".into()), Some(1));
        }
    }

    mod property_tests {
        use super::*;

        fn run<T>(future: impl std::future::Future<Output = T>) -> T {
            tokio::runtime::Builder::new_current_thread()
                .enable_time()
                .build()
                .unwrap()
                .block_on(future)
        }

        fn table_strategy() -> impl Strategy<Value = (usize, Vec<Vec<String>>)> {
            (1usize..4).prop_flat_map(|columns| {
                let cell = prop::sample::select(vec!["a", "b", "c"]).prop_map(String::from);
                let row = prop::collection::vec(cell, 0..=columns);
                (Just(columns), prop::collection::vec(row, 0..6))
            })
        }

        fn mount(columns: usize, rows: &[Vec<String>]) -> MockDriver {
            let names: Vec<String> = (0..columns).map(|i| format!("c{i}")).collect();
            let names: Vec<&str> = names.iter().map(String::as_str).collect();
            let driver = MockDriver::new();
            driver.mount(MockElement::table("t", &names, rows.to_vec()));
            driver
        }

        proptest! {
            #[test]
            fn prop_never_more_results_than_rows(
                (columns, rows) in table_strategy(),
                search in 0usize..4,
                result in 0usize..4,
                value in prop::option::of(prop::sample::select(vec!["a", "b", "z"])),
            ) {
                let driver = mount(columns, &rows);
                let found = run(async {
                    let waiter = Waiter::with_options(&driver, fast());
                    query_table(&waiter, &"t".into(), Some(search.into()), value, Some(result.into())).await
                }).unwrap();
                prop_assert!(found.len() <= rows.len());
            }

            #[test]
            fn prop_wildcard_yields_one_per_eligible_row(
                (columns, rows) in table_strategy(),
                search in 0usize..3,
            ) {
                prop_assume!(search < columns);
                let driver = mount(columns, &rows);
                let found = run(async {
                    let waiter = Waiter::with_options(&driver, fast());
                    query_table(&waiter, &"t".into(), Some(search.into()), None, None).await
                }).unwrap();
                let eligible = rows.iter().filter(|r| r.len() > search).count();
                prop_assert_eq!(found.len(), eligible);
            }

            #[test]
            fn prop_unresolvable_column_is_empty(
                (columns, rows) in table_strategy(),
                bogus in "[a-z]{3,8}",
            ) {
                let driver = mount(columns, &rows);
                let found = run(async {
                    let waiter = Waiter::with_options(&driver, fast());
                    query_table(&waiter, &"t".into(), Some(ColumnRef::Name(bogus)), Some("a"), None).await
                }).unwrap();
                prop_assert!(found.is_empty());
            }
        }
    }
}
