//! Coordinate projection: boundary-relative tract offsets back to absolute
//! genome coordinates, strand- and direction-aware.
//!
//! A tract stores offsets measured outward from the gene boundary. For an
//! upstream tract of a `+` gene the offsets grow leftward from `gene.start`;
//! for a `-` gene upstream lies rightward of `gene.end`. Downstream mirrors
//! this with the opposite boundary.

use crate::model::{Direction, GeneRecord, Strand, TractRecord};

/// Project a boundary-relative (start, end) offset pair to an absolute
/// genome interval with start < end.
pub fn project(direction: Direction, gene: &GeneRecord, rel: (i64, i64)) -> (i64, i64) {
    let (rel_start, rel_end) = rel;
    match (direction, gene.strand) {
        (Direction::Up, Strand::Forward) | (Direction::Down, Strand::Reverse) => {
            (gene.start - rel_end, gene.start - rel_start)
        }
        (Direction::Up, Strand::Reverse) | (Direction::Down, Strand::Forward) => {
            (gene.end + rel_start, gene.end + rel_end)
        }
    }
}

/// The single representative point of a projected tract: its gene-proximal
/// boundary.
pub fn breakpoint(direction: Direction, gene: &GeneRecord, rel: (i64, i64)) -> i64 {
    let (rel_start, _) = rel;
    match (direction, gene.strand) {
        (Direction::Up, Strand::Forward) | (Direction::Down, Strand::Reverse) => {
            gene.start - rel_start
        }
        (Direction::Up, Strand::Reverse) | (Direction::Down, Strand::Forward) => {
            gene.end + rel_start
        }
    }
}

/// Re-derive the boundary-relative offsets from an absolute interval.
/// Inverse of `project` for round-trip validation.
pub fn relative_from_absolute(
    direction: Direction,
    gene: &GeneRecord,
    abs: (i64, i64),
) -> (i64, i64) {
    let (abs_start, abs_end) = abs;
    match (direction, gene.strand) {
        (Direction::Up, Strand::Forward) | (Direction::Down, Strand::Reverse) => {
            (gene.start - abs_end, gene.start - abs_start)
        }
        (Direction::Up, Strand::Reverse) | (Direction::Down, Strand::Forward) => {
            (abs_start - gene.end, abs_end - gene.end)
        }
    }
}

/// Project a tract record, clamping the result to [0, chrom_len].
pub fn project_tract(tract: &TractRecord, gene: &GeneRecord, chrom_len: i64) -> (i64, i64) {
    let (start, end) = project(tract.direction, gene, (tract.start, tract.end));
    (start.max(0), end.min(chrom_len))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gene(strand: Strand) -> GeneRecord {
        GeneRecord {
            gene_id: "G".to_string(),
            chrom: "chr1".to_string(),
            start: 1000,
            end: 1200,
            strand,
        }
    }

    #[test]
    fn test_up_forward_projection() {
        // Relative up tract [100, 300) of a + gene at [1000, 1200)
        let abs = project(Direction::Up, &gene(Strand::Forward), (100, 300));
        assert_eq!(abs, (700, 900));
    }

    #[test]
    fn test_up_reverse_projection() {
        let abs = project(Direction::Up, &gene(Strand::Reverse), (100, 300));
        assert_eq!(abs, (1300, 1500));
    }

    #[test]
    fn test_down_forward_projection() {
        let abs = project(Direction::Down, &gene(Strand::Forward), (0, 250));
        assert_eq!(abs, (1200, 1450));
    }

    #[test]
    fn test_down_reverse_projection() {
        let abs = project(Direction::Down, &gene(Strand::Reverse), (0, 250));
        assert_eq!(abs, (750, 1000));
    }

    #[test]
    fn test_round_trip_all_cases() {
        for direction in [Direction::Up, Direction::Down] {
            for strand in [Strand::Forward, Strand::Reverse] {
                let g = gene(strand);
                let rel = (120, 480);
                let abs = project(direction, &g, rel);
                assert!(abs.0 < abs.1);
                assert_eq!(relative_from_absolute(direction, &g, abs), rel);
            }
        }
    }

    #[test]
    fn test_breakpoint_is_gene_proximal_bound() {
        let g = gene(Strand::Forward);
        let rel = (100, 300);
        let bp = breakpoint(Direction::Up, &g, rel);
        let abs = project(Direction::Up, &g, rel);
        // Proximal edge of (700, 900) relative to gene.start=1000 is 900
        assert_eq!(bp, 900);
        assert_eq!(bp, abs.1);

        let bp_down = breakpoint(Direction::Down, &g, rel);
        let abs_down = project(Direction::Down, &g, rel);
        assert_eq!(bp_down, abs_down.0);
    }

    #[test]
    fn test_project_tract_clamps() {
        let tract = TractRecord {
            gene_id: "G".to_string(),
            start: 0,
            end: 5000,
            direction: Direction::Up,
        };
        let g = gene(Strand::Forward);
        let (start, end) = project_tract(&tract, &g, 1_000_000);
        assert_eq!((start, end), (0, 1000));
    }
}
