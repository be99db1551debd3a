//! Boundary extension.
//!
//! Given the cleaned candidate spans for one side of a flank, compute the
//! maximal contiguous homologous extension from the gene boundary outward.
//! Consecutive spans join the chain only while the gap between them stays
//! within the distance cutoff; isolated islands beyond the cutoff are not
//! contiguous synteny and are excluded.
//!
//! Flank coordinates place the gene-proximal edge at the right end of an Up
//! flank (position `flank_len`) and at the left end of a Down flank
//! (position 0), so the Up variant walks spans in descending order and the
//! Down variant in ascending order.

use crate::model::Direction;

pub const DEFAULT_MAX_GAP: i64 = 500;

/// The accepted chain for one side plus its overall span.
#[derive(Debug, Clone, PartialEq)]
pub struct Extension {
    pub chain: Vec<(i64, i64)>,
    pub span: (i64, i64),
}

/// Compute the boundary extension for one side. Returns None when no
/// candidate anchors at the gene boundary within `max_gap`.
pub fn extend_toward_boundary(
    direction: Direction,
    spans: &[(i64, i64)],
    flank_len: i64,
    max_gap: i64,
) -> Option<Extension> {
    match direction {
        Direction::Up => extend_up(spans, flank_len, max_gap),
        Direction::Down => extend_down(spans, max_gap),
    }
}

/// Down variant: ascending walk from position 0 (the gene's far boundary).
fn extend_down(spans: &[(i64, i64)], max_gap: i64) -> Option<Extension> {
    let mut sorted = spans.to_vec();
    sorted.sort_unstable();

    let first = *sorted.first()?;
    if first.0 > max_gap {
        return None;
    }

    let mut chain = vec![first];
    let mut prev_end = first.1;
    for &(start, end) in &sorted[1..] {
        if start <= prev_end + max_gap {
            chain.push((start, end));
            prev_end = end;
        } else {
            break;
        }
    }

    let span = chain_span(&chain);
    Some(Extension { chain, span })
}

/// Up variant: descending walk anchored at the flank's right edge.
fn extend_up(spans: &[(i64, i64)], flank_len: i64, max_gap: i64) -> Option<Extension> {
    let mut sorted = spans.to_vec();
    sorted.sort_unstable_by_key(|&(start, end)| (std::cmp::Reverse(end), std::cmp::Reverse(start)));

    let first = *sorted.first()?;
    if (flank_len - first.1).abs() > max_gap {
        return None;
    }

    let mut chain = vec![first];
    let (mut prev_start, mut prev_end) = first;
    for &(start, end) in &sorted[1..] {
        let overlap = start < prev_end && end > prev_start;
        let gap = if start >= prev_end {
            start - prev_end
        } else {
            (prev_start - end).max(0)
        };
        if overlap || gap <= max_gap {
            chain.push((start, end));
            prev_start = start;
            prev_end = end;
        } else {
            break;
        }
    }

    let span = chain_span(&chain);
    Some(Extension { chain, span })
}

fn chain_span(chain: &[(i64, i64)]) -> (i64, i64) {
    let start = chain.iter().map(|&(s, _)| s).min().unwrap_or(0);
    let end = chain.iter().map(|&(_, e)| e).max().unwrap_or(0);
    (start, end)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_down_anchor_must_touch_boundary() {
        // First span starts beyond the cutoff: nothing anchors
        let spans = vec![(600, 900), (1000, 1200)];
        assert!(extend_down(&spans, DEFAULT_MAX_GAP).is_none());
    }

    #[test]
    fn test_down_chain_with_gaps() {
        let spans = vec![(0, 300), (400, 900), (1500, 2000), (10000, 12000)];
        let ext = extend_down(&spans, DEFAULT_MAX_GAP).unwrap();
        // 10000 is 8000 past the chain end: excluded as an isolated island
        assert_eq!(ext.chain, vec![(0, 300), (400, 900), (1500, 2000)]);
        assert_eq!(ext.span, (0, 2000));
    }

    #[test]
    fn test_down_overlapping_spans_chain() {
        let spans = vec![(0, 500), (200, 800)];
        let ext = extend_down(&spans, DEFAULT_MAX_GAP).unwrap();
        assert_eq!(ext.span, (0, 800));
    }

    #[test]
    fn test_up_anchor_must_reach_flank_edge() {
        // Flank length 10000: the rightmost span ends 800 short of the edge
        let spans = vec![(8000, 9200), (7000, 7900)];
        assert!(extend_up(&spans, 10000, DEFAULT_MAX_GAP).is_none());
    }

    #[test]
    fn test_up_chain_descending() {
        let spans = vec![(9000, 10000), (8000, 8900), (2000, 3000)];
        let ext = extend_up(&spans, 10000, DEFAULT_MAX_GAP).unwrap();
        // Gap 8000->9000 is 100; 3000->8000 is 5000, chain stops
        assert_eq!(ext.chain, vec![(9000, 10000), (8000, 8900)]);
        assert_eq!(ext.span, (8000, 10000));
    }

    #[test]
    fn test_up_unsorted_input_is_sorted_first() {
        let spans = vec![(8000, 8900), (9000, 10000)];
        let ext = extend_up(&spans, 10000, DEFAULT_MAX_GAP).unwrap();
        assert_eq!(ext.span, (8000, 10000));
    }

    #[test]
    fn test_empty_input() {
        assert!(extend_toward_boundary(Direction::Up, &[], 10000, DEFAULT_MAX_GAP).is_none());
        assert!(extend_toward_boundary(Direction::Down, &[], 10000, DEFAULT_MAX_GAP).is_none());
    }
}
