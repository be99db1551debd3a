//! Region merging: one representative span per gene.
//!
//! The extender emits the accepted chain per side; the merger reduces each
//! gene's chain to the single widest contiguous interval. Genes with zero
//! surviving spans are dropped from the output — absence signals "no
//! confirmable homology" for that gene in that round.

use rustc_hash::FxHashMap;

/// Merge one gene's accepted spans into a single [start, end) interval.
pub fn merge_spans(spans: &[(i64, i64)]) -> Option<(i64, i64)> {
    if spans.is_empty() {
        return None;
    }
    let start = spans.iter().map(|&(s, _)| s).min()?;
    let end = spans.iter().map(|&(_, e)| e).max()?;
    Some((start, end))
}

/// Merge per-gene span lists; genes with empty lists are dropped.
pub fn merge_per_gene(
    per_gene: &FxHashMap<String, Vec<(i64, i64)>>,
) -> FxHashMap<String, (i64, i64)> {
    per_gene
        .iter()
        .filter_map(|(gene, spans)| merge_spans(spans).map(|span| (gene.clone(), span)))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_merge_spans_union() {
        let spans = vec![(100, 300), (250, 600), (650, 900)];
        assert_eq!(merge_spans(&spans), Some((100, 900)));
    }

    #[test]
    fn test_merge_spans_empty() {
        assert_eq!(merge_spans(&[]), None);
    }

    #[test]
    fn test_merge_per_gene_drops_empty() {
        let mut per_gene: FxHashMap<String, Vec<(i64, i64)>> = FxHashMap::default();
        per_gene.insert("geneA".to_string(), vec![(0, 100), (50, 200)]);
        per_gene.insert("geneB".to_string(), vec![]);
        let merged = merge_per_gene(&per_gene);
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.get("geneA"), Some(&(0, 200)));
    }

    #[test]
    fn test_at_most_one_interval_per_gene() {
        let mut per_gene: FxHashMap<String, Vec<(i64, i64)>> = FxHashMap::default();
        per_gene.insert("geneA".to_string(), vec![(10, 20), (30, 40), (5, 15)]);
        let merged = merge_per_gene(&per_gene);
        // Merge closure: the output span covers the union of the chain
        assert_eq!(merged.get("geneA"), Some(&(5, 40)));
        assert_eq!(merged.len(), 1);
    }
}
