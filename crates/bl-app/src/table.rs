//! Parsing of the model's tabular text output.

use bl_core::ElementName;
use tracing::debug;

/// Marker of comment and header rows in `show lat` output.
const COMMENT_MARKER: char = '#';

/// Fields per `show lat -attribute` row: index, name, key, s, length, value.
const ATTRIBUTE_ROW_FIELDS: usize = 6;

/// Element names from `show ele` output.
///
/// The last line is a summary trailer and is dropped. The element name is the
/// second whitespace-separated token; lines with fewer tokens are skipped.
pub fn parse_element_list(lines: &[String]) -> Vec<ElementName> {
    let Some((_trailer, rows)) = lines.split_last() else {
        return Vec::new();
    };
    rows.iter()
        .filter_map(|row| row.split_whitespace().nth(1))
        .map(ElementName::new)
        .collect()
}

/// One row of `show lat -attribute` output.
#[derive(Debug, Clone, PartialEq)]
pub struct AttributeRow {
    pub element: ElementName,
    /// Element length (m)
    pub length: f64,
    pub value: f64,
}

/// Rows of `show lat -no_label_lines -attribute {attr} {pattern}` output.
///
/// Rows containing `#` are skipped, as are rows that do not split into
/// exactly six fields or whose numeric fields do not parse.
pub fn parse_attribute_table(lines: &[String]) -> Vec<AttributeRow> {
    lines
        .iter()
        .filter(|row| !row.contains(COMMENT_MARKER))
        .filter_map(|row| {
            let parsed = parse_attribute_row(row);
            if parsed.is_none() && !row.trim().is_empty() {
                debug!(row = %row, "Skipping unparseable attribute row");
            }
            parsed
        })
        .collect()
}

fn parse_attribute_row(row: &str) -> Option<AttributeRow> {
    let fields: Vec<&str> = row.split_whitespace().collect();
    if fields.len() != ATTRIBUTE_ROW_FIELDS {
        return None;
    }
    Some(AttributeRow {
        element: ElementName::new(fields[1]),
        length: fields[4].parse().ok()?,
        value: fields[5].parse().ok()?,
    })
}
