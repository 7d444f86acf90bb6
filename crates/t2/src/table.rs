//! Parser for fixed-width CLI table output.
//!
//! The first line is a header of column names separated by runs of
//! whitespace. A column spans from the start of its name up to the start of
//! the next column name; the last column extends to the end of the line.
//! Values containing whitespace runs that cross a column boundary are
//! mis-sliced; this is a property of the format.

use std::collections::BTreeMap;

/// One data row, keyed by column name.
pub type Row = BTreeMap<String, String>;

/// A column and its character span in the header.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Column {
    name: String,
    start: usize,
    end: Option<usize>,
}

/// Locate the columns of a header line.
fn columns(header: &str) -> Vec<Column> {
    let chars: Vec<char> = header.chars().collect();
    let mut starts = Vec::new();
    let mut index = 0;

    while index < chars.len() {
        if chars[index].is_whitespace() {
            index += 1;
            continue;
        }
        let start = index;
        while index < chars.len() && !chars[index].is_whitespace() {
            index += 1;
        }
        starts.push((chars[start..index].iter().collect::<String>(), start));
    }

    starts
        .iter()
        .enumerate()
        .map(|(i, (name, start))| Column {
            name: name.clone(),
            start: *start,
            end: starts.get(i + 1).map(|(_, next)| *next),
        })
        .collect()
}

/// Slice `line` by character offsets, tolerating short lines.
fn slice(line: &[char], start: usize, end: Option<usize>) -> String {
    let end = end.unwrap_or(line.len()).min(line.len());
    if start >= end {
        return String::new();
    }
    line[start..end].iter().collect::<String>().trim().to_string()
}

/// Parse table lines (header first) into rows.
///
/// Empty input and header-only input both yield no rows.
#[must_use]
pub fn parse_table<S: AsRef<str>>(lines: &[S]) -> Vec<Row> {
    let Some((header, rows)) = lines.split_first() else {
        return Vec::new();
    };
    let columns = columns(header.as_ref());

    rows.iter()
        .map(|line| {
            let chars: Vec<char> = line.as_ref().chars().collect();
            columns
                .iter()
                .map(|c| (c.name.clone(), slice(&chars, c.start, c.end)))
                .collect()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_simple_table() {
        let rows = parse_table(&["ID   NAME   STATE", "abc  foo    READY "]);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["ID"], "abc");
        assert_eq!(rows[0]["NAME"], "foo");
        assert_eq!(rows[0]["STATE"], "READY");
    }

    #[test]
    fn test_empty_output() {
        assert!(parse_table::<&str>(&[]).is_empty());
        assert!(parse_table(&["ID   NAME   STATE"]).is_empty());
    }

    #[test]
    fn test_short_rows_yield_empty_fields() {
        let rows = parse_table(&["ID   NAME   STATE", "abc"]);
        assert_eq!(rows[0]["ID"], "abc");
        assert_eq!(rows[0]["NAME"], "");
        assert_eq!(rows[0]["STATE"], "");
    }

    #[test]
    fn test_column_names_are_substrings_of_earlier_names() {
        // "Id" also occurs inside "DatacenterId"; offsets must not collide.
        let rows = parse_table(&[
            "DatacenterId   Id    State",
            "dc-1           x-2   AVAILABLE",
        ]);
        assert_eq!(rows[0]["DatacenterId"], "dc-1");
        assert_eq!(rows[0]["Id"], "x-2");
        assert_eq!(rows[0]["State"], "AVAILABLE");
    }

    #[test]
    fn test_ionosctl_datacenter_list() {
        let line = |a: &str, b: &str, c: &str, d: &str, e: &str| {
            format!("{a:<39}{b:<13}{c:<11}{d:<12}{e}")
        };
        let output = [
            line("DatacenterId", "Name", "Location", "State", "Description"),
            line("5b1e3d1c-0f0a-4b9e-9a7e-1e2f3a4b5c6d", "0123456789", "de/txl", "AVAILABLE", ""),
            line("7c2f4e2d-1a1b-4c0f-8b8f-2f3a4b5c6d7e", "other-dc", "de/fra", "BUSY", "test dc"),
        ];
        let rows = parse_table(&output);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0]["DatacenterId"], "5b1e3d1c-0f0a-4b9e-9a7e-1e2f3a4b5c6d");
        assert_eq!(rows[0]["Location"], "de/txl");
        assert_eq!(rows[0]["State"], "AVAILABLE");
        assert_eq!(rows[0]["Description"], "");
        assert_eq!(rows[1]["State"], "BUSY");
        assert_eq!(rows[1]["Description"], "test dc");
    }
}
