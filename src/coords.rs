//! Alignment coordinate-table parsing.
//!
//! Consumes the tab-delimited, headerless table produced by
//! `show-coords -rclTH` on a delta-filtered promer alignment. The first four
//! columns are the reference and query spans (1-based, inclusive, possibly
//! inverted for reverse hits); the last two columns are the sequence labels.
//! Rows are normalized to 0-based half-open coordinates with `start < end`,
//! recording the original orientation in the strand field.

use crate::model::Strand;
use log::debug;
use std::io::BufRead;

/// One alignment hit: a pair of spans over the reference and query flanks.
/// Transient within a round; produced by parsing, consumed by cleaning.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CoordRow {
    pub ref_start: i64,
    pub ref_end: i64,
    pub ref_strand: Strand,
    pub query_start: i64,
    pub query_end: i64,
    pub query_strand: Strand,
    pub ref_label: String,
    pub query_label: String,
}

/// Which side of a coordinate row to inspect.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Side {
    Reference,
    Query,
}

impl Side {
    pub fn span(&self, row: &CoordRow) -> (i64, i64) {
        match self {
            Side::Reference => (row.ref_start, row.ref_end),
            Side::Query => (row.query_start, row.query_end),
        }
    }

    pub fn strand(&self, row: &CoordRow) -> Strand {
        match self {
            Side::Reference => row.ref_strand,
            Side::Query => row.query_strand,
        }
    }

    pub fn label<'a>(&self, row: &'a CoordRow) -> &'a str {
        match self {
            Side::Reference => &row.ref_label,
            Side::Query => &row.query_label,
        }
    }
}

/// Normalize a 1-based inclusive span to 0-based half-open with start < end.
/// Inverted spans (start > end) encode a reverse-orientation hit.
fn oriented(start: i64, end: i64) -> ((i64, i64), Strand) {
    if start <= end {
        ((start - 1, end), Strand::Forward)
    } else {
        ((end - 1, start), Strand::Reverse)
    }
}

/// Parse one table row. Returns None for rows that fail field-count or
/// numeric validation; such rows are unusable and dropped by the caller.
pub fn parse_coords_line(line: &str) -> Option<CoordRow> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 6 {
        return None;
    }

    let rs = fields[0].trim().parse::<i64>().ok()?;
    let re = fields[1].trim().parse::<i64>().ok()?;
    let qs = fields[2].trim().parse::<i64>().ok()?;
    let qe = fields[3].trim().parse::<i64>().ok()?;
    if rs < 1 || re < 1 || qs < 1 || qe < 1 {
        return None;
    }

    let ((ref_start, ref_end), ref_strand) = oriented(rs, re);
    let ((query_start, query_end), query_strand) = oriented(qs, qe);

    let ref_label = fields[fields.len() - 2].trim();
    let query_label = fields[fields.len() - 1].trim();
    if ref_label.is_empty() || query_label.is_empty() {
        return None;
    }

    Some(CoordRow {
        ref_start,
        ref_end,
        ref_strand,
        query_start,
        query_end,
        query_strand,
        ref_label: ref_label.to_string(),
        query_label: query_label.to_string(),
    })
}

/// Parse a whole coordinate table, silently dropping malformed rows.
/// An empty table is a valid result (no detectable homology).
pub fn parse_coords<R: BufRead>(reader: R) -> std::io::Result<Vec<CoordRow>> {
    let mut rows = Vec::new();
    let mut dropped = 0usize;
    for line_result in reader.lines() {
        let line = line_result?;
        let trimmed = line.trim_end();
        if trimmed.is_empty() {
            continue;
        }
        match parse_coords_line(trimmed) {
            Some(row) => rows.push(row),
            None => dropped += 1,
        }
    }
    if dropped > 0 {
        debug!("Dropped {} malformed coordinate rows", dropped);
    }
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_coords_line_forward() {
        let line = "101\t200\t301\t400\t100\t100\t95.0\t96.0\t0.0\t50000\t50000\t0.2\t0.2\trefA\tqryB";
        let row = parse_coords_line(line).unwrap();
        assert_eq!((row.ref_start, row.ref_end), (100, 200));
        assert_eq!((row.query_start, row.query_end), (300, 400));
        assert_eq!(row.ref_strand, Strand::Forward);
        assert_eq!(row.query_strand, Strand::Forward);
        assert_eq!(row.ref_label, "refA");
        assert_eq!(row.query_label, "qryB");
    }

    #[test]
    fn test_parse_coords_line_inverted_query() {
        // Query span runs backwards: orientation-corrected by swapping
        let line = "101\t200\t400\t301\t100\t100\t95.0\t96.0\t0.0\t50000\t50000\t0.2\t0.2\trefA\tqryB";
        let row = parse_coords_line(line).unwrap();
        assert_eq!((row.query_start, row.query_end), (300, 400));
        assert_eq!(row.query_strand, Strand::Reverse);
        assert_eq!(row.ref_strand, Strand::Forward);
    }

    #[test]
    fn test_parse_coords_line_malformed() {
        assert!(parse_coords_line("101\t200\t301").is_none());
        assert!(parse_coords_line("x\t200\t301\t400\trefA\tqryB").is_none());
        assert!(parse_coords_line("0\t200\t301\t400\trefA\tqryB").is_none());
    }

    #[test]
    fn test_parse_coords_drops_malformed_rows() {
        let table = "101\t200\t301\t400\t100\t100\t95.0\trefA\tqryB\nnot\ta\trow\n\n201\t300\t401\t500\t100\t100\t95.0\trefA\tqryB\n";
        let rows = parse_coords(table.as_bytes()).unwrap();
        assert_eq!(rows.len(), 2);
    }

    #[test]
    fn test_parse_coords_empty() {
        let rows = parse_coords("".as_bytes()).unwrap();
        assert!(rows.is_empty());
    }
}
