//! Outlier rejection on paired coordinate rows.
//!
//! Alignment hits are noisy: a single global sort can discard a valid
//! contiguous run when the very first row is itself an outlier. Each
//! direction is therefore filtered twice, once sorted reference-major and
//! once query-major, and the two anchored prefixes are unioned. A row
//! survives if it is within tolerance of the anchor under either ordering.

use crate::coords::CoordRow;
use crate::model::Direction;
use rustc_hash::FxHashSet;

pub const DEFAULT_TOLERANCE: i64 = 500;

/// Positions compared against the anchor: end pair for Up (extension walks
/// toward the gene-proximal right edge in descending order), start pair for
/// Down (ascending from the gene-proximal left edge).
fn anchor_positions(direction: Direction, row: &CoordRow) -> (i64, i64) {
    match direction {
        Direction::Up => (row.ref_end, row.query_end),
        Direction::Down => (row.ref_start, row.query_start),
    }
}

/// Retain the contiguous prefix anchored at the first row of `sorted`,
/// extending while both the reference and query positions stay within
/// `tolerance` of the anchor's corresponding positions. The first
/// out-of-window row stops the scan.
fn anchored_prefix<'a>(
    sorted: &[&'a CoordRow],
    direction: Direction,
    tolerance: i64,
) -> Vec<&'a CoordRow> {
    let Some(first) = sorted.first() else {
        return Vec::new();
    };
    let (anchor_r, anchor_q) = anchor_positions(direction, first);

    let mut kept = Vec::with_capacity(sorted.len());
    for row in sorted {
        let (r, q) = anchor_positions(direction, row);
        if (r - anchor_r).abs() > tolerance || (q - anchor_q).abs() > tolerance {
            break;
        }
        kept.push(*row);
    }
    kept
}

/// Filter paired rows for one direction. Returns the surviving rows in the
/// direction's primary order, deduplicated by structural row equality.
/// An empty input yields an empty output.
pub fn filter_paired_rows(
    rows: &[CoordRow],
    direction: Direction,
    tolerance: i64,
) -> Vec<CoordRow> {
    if rows.is_empty() {
        return Vec::new();
    }

    let mut ref_major: Vec<&CoordRow> = rows.iter().collect();
    let mut query_major: Vec<&CoordRow> = rows.iter().collect();
    match direction {
        Direction::Up => {
            ref_major.sort_by_key(|r| (std::cmp::Reverse(r.ref_end), std::cmp::Reverse(r.query_end)));
            query_major
                .sort_by_key(|r| (std::cmp::Reverse(r.query_end), std::cmp::Reverse(r.ref_end)));
        }
        Direction::Down => {
            ref_major.sort_by_key(|r| (r.ref_start, r.query_start));
            query_major.sort_by_key(|r| (r.query_start, r.ref_start));
        }
    }

    let mut survivors: FxHashSet<&CoordRow> = FxHashSet::default();
    survivors.extend(anchored_prefix(&ref_major, direction, tolerance));
    survivors.extend(anchored_prefix(&query_major, direction, tolerance));

    // Emit in the primary (reference-major) order, deduplicated
    let mut seen: FxHashSet<&CoordRow> = FxHashSet::default();
    ref_major
        .into_iter()
        .filter(|r| survivors.contains(r) && seen.insert(*r))
        .cloned()
        .collect()
}
