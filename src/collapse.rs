//! Nested-interval collapse.
//!
//! A single left-to-right sweep over one side of the coordinate rows,
//! dropping any row whose span is fully contained in the maximal extent
//! retained so far for the same label and strand.

use crate::coords::{CoordRow, Side};
use crate::model::Strand;

/// Remove rows whose `side` span is nested inside a previously retained
/// span. The extent resets whenever the label or strand changes, so mixed
/// groups are collapsed independently.
pub fn collapse_nested(rows: &[CoordRow], side: Side) -> Vec<CoordRow> {
    let mut kept: Vec<CoordRow> = Vec::with_capacity(rows.len());
    let mut extent: Option<(String, Strand, i64, i64)> = None;

    for row in rows {
        let (start, end) = side.span(row);
        let strand = side.strand(row);
        let label = side.label(row);

        match &mut extent {
            Some((ext_label, ext_strand, ext_start, ext_end))
                if ext_label == label && *ext_strand == strand =>
            {
                if start >= *ext_start && end <= *ext_end {
                    continue;
                }
                *ext_start = (*ext_start).min(start);
                *ext_end = (*ext_end).max(end);
            }
            _ => {
                extent = Some((label.to_string(), strand, start, end));
            }
        }
        kept.push(row.clone());
    }
    kept
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(rs: i64, re: i64, strand: Strand) -> CoordRow {
        CoordRow {
            ref_start: rs,
            ref_end: re,
            ref_strand: strand,
            query_start: rs,
            query_end: re,
            query_strand: strand,
            ref_label: "ref".to_string(),
            query_label: "qry".to_string(),
        }
    }

    #[test]
    fn test_contained_interval_dropped() {
        let rows = vec![
            row(0, 100, Strand::Forward),
            row(10, 20, Strand::Forward),
            row(50, 200, Strand::Forward),
        ];
        let kept = collapse_nested(&rows, Side::Reference);
        let spans: Vec<(i64, i64)> = kept.iter().map(|r| (r.ref_start, r.ref_end)).collect();
        assert_eq!(spans, vec![(0, 100), (50, 200)]);
    }

    #[test]
    fn test_idempotence() {
        let rows = vec![
            row(0, 100, Strand::Forward),
            row(10, 20, Strand::Forward),
            row(50, 200, Strand::Forward),
            row(60, 190, Strand::Forward),
        ];
        let once = collapse_nested(&rows, Side::Reference);
        let twice = collapse_nested(&once, Side::Reference);
        assert_eq!(once, twice);
    }

    #[test]
    fn test_no_mutual_containment_in_output() {
        let rows = vec![
            row(0, 100, Strand::Forward),
            row(5, 50, Strand::Forward),
            row(20, 300, Strand::Forward),
            row(30, 250, Strand::Forward),
        ];
        let kept = collapse_nested(&rows, Side::Reference);
        for (i, a) in kept.iter().enumerate() {
            for (j, b) in kept.iter().enumerate() {
                if i == j {
                    continue;
                }
                let contained =
                    a.ref_start >= b.ref_start && a.ref_end <= b.ref_end;
                assert!(!contained, "{:?} contained in {:?}", a, b);
            }
        }
    }

    #[test]
    fn test_strand_groups_collapse_independently() {
        let rows = vec![
            row(0, 100, Strand::Forward),
            row(10, 20, Strand::Reverse),
            row(12, 18, Strand::Reverse),
        ];
        let kept = collapse_nested(&rows, Side::Reference);
        // The reverse-strand pair starts a fresh extent; only its nested
        // member is dropped
        assert_eq!(kept.len(), 2);
    }

    #[test]
    fn test_query_side() {
        let mut a = row(0, 100, Strand::Forward);
        a.query_start = 0;
        a.query_end = 50;
        let mut b = row(200, 300, Strand::Forward);
        b.query_start = 10;
        b.query_end = 40;
        let kept = collapse_nested(&[a, b], Side::Query);
        // Nested on the query side even though disjoint on the reference
        assert_eq!(kept.len(), 1);
    }

    #[test]
    fn test_empty() {
        assert!(collapse_nested(&[], Side::Reference).is_empty());
    }
}
