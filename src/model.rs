use serde::{Deserialize, Serialize};
use std::fmt;

/// Strand orientation for genes and alignment spans
#[derive(Default, PartialEq, Eq, Hash, Clone, Copy, Debug, Serialize, Deserialize)]
#[repr(u8)]
pub enum Strand {
    #[default]
    Forward,
    Reverse,
}

impl Strand {
    pub fn from_char(c: char) -> Option<Self> {
        match c {
            '+' => Some(Strand::Forward),
            '-' => Some(Strand::Reverse),
            _ => None,
        }
    }

    pub fn as_char(&self) -> char {
        match self {
            Strand::Forward => '+',
            Strand::Reverse => '-',
        }
    }
}

impl fmt::Display for Strand {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_char())
    }
}

/// Extension direction relative to the gene: Up grows away from the 5' side
/// of the flank-ordered sequence (toward smaller genomic distance labels),
/// Down from the gene's far boundary in increasing-position order.
#[derive(PartialEq, Eq, PartialOrd, Ord, Hash, Clone, Copy, Debug, Serialize, Deserialize)]
pub enum Direction {
    Up,
    Down,
}

impl Direction {
    pub fn label(&self) -> &'static str {
        match self {
            Direction::Up => "up",
            Direction::Down => "down",
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// One gene from the annotation table. Immutable once loaded.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeneRecord {
    pub gene_id: String,
    pub chrom: String,
    pub start: i64,
    pub end: i64,
    pub strand: Strand,
}

impl GeneRecord {
    pub fn length(&self) -> i64 {
        self.end - self.start
    }
}

/// One duplicated gene pair from the classification table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GenePair {
    pub pair_id: String,
    pub gene_a: String,
    pub gene_b: String,
    pub dup_type: String,
}

impl GenePair {
    /// Human-readable label joining the two member genes.
    pub fn label(&self) -> String {
        format!("{}-{}", self.gene_a, self.gene_b)
    }
}

/// The accepted homology tract for one gene copy in one round, expressed as
/// boundary-relative offsets: `start` is the gene-proximal offset, `end` the
/// gene-distal one, both measured outward from the gene boundary.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TractRecord {
    pub gene_id: String,
    pub start: i64,
    pub end: i64,
    pub direction: Direction,
}

impl TractRecord {
    pub fn length(&self) -> i64 {
        self.end - self.start
    }
}

/// Convergence signal: the pair's tracts still reach the edge of the searched
/// window, so the pair must be carried into the next (longer) round.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CheckRecord {
    pub gene_id: String,
    pub coverage_length: i64,
    pub direction: Direction,
    pub pair_label: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_strand_chars() {
        assert_eq!(Strand::from_char('+'), Some(Strand::Forward));
        assert_eq!(Strand::from_char('-'), Some(Strand::Reverse));
        assert_eq!(Strand::from_char('.'), None);
        assert_eq!(Strand::Forward.as_char(), '+');
        assert_eq!(Strand::Reverse.to_string(), "-");
    }

    #[test]
    fn test_direction_labels() {
        assert_eq!(Direction::Up.label(), "up");
        assert_eq!(Direction::Down.to_string(), "down");
    }

    #[test]
    fn test_gene_length() {
        let gene = GeneRecord {
            gene_id: "g1".to_string(),
            chrom: "chr1".to_string(),
            start: 1000,
            end: 1200,
            strand: Strand::Forward,
        };
        assert_eq!(gene.length(), 200);
    }
}
