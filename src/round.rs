//! One round of extension at a fixed flank size.
//!
//! Per pair and direction the orchestrator walks EXTRACTED → ALIGNED →
//! CLEANED → EXTENDED → MERGED → CHECKED. Pairs are independent within a
//! round and run on the bounded dispatcher; a pair whose alignment produces
//! no output yields zero tracts and is not fatal to the round.

use crate::align::Aligner;
use crate::collapse::collapse_nested;
use crate::coords::{CoordRow, Side};
use crate::dispatch::{run_batch, BatchOutcome};
use crate::extend::extend_toward_boundary;
use crate::faidx::GenomeStore;
use crate::filter::filter_paired_rows;
use crate::merge::merge_spans;
use crate::model::{CheckRecord, Direction, GenePair, GeneRecord, TractRecord};
use log::debug;
use rustc_hash::{FxHashMap, FxHashSet};
use std::io;
use std::path::Path;

/// Knobs for one round, shared by every pair in it.
#[derive(Debug, Clone)]
pub struct RoundConfig {
    /// 1-based round number, used for working-directory and file naming.
    pub round_index: usize,
    /// Nominal flank size for this round.
    pub flank_len: i64,
    /// Identity threshold handed to the alignment collaborator.
    pub min_identity: f64,
    /// Outlier window for the paired-row filter.
    pub tolerance: i64,
    /// Maximum gap joining consecutive spans into one extension.
    pub max_gap: i64,
    /// Fraction of the flank a tract must exceed to count as still bound
    /// by the search window edge.
    pub coverage_fraction: f64,
    /// Worker-pool bound for the round's batch.
    pub concurrency: usize,
}

/// Per-pair outcome of one round.
#[derive(Debug, Clone)]
pub struct PairResult {
    pub pair: GenePair,
    pub direction: Direction,
    pub tracts: Vec<TractRecord>,
    pub checks: Vec<CheckRecord>,
}

impl PairResult {
    /// A pair converged when it produced no CheckRecord: its homology
    /// extent is no longer bound by the searched window edge.
    pub fn converged(&self) -> bool {
        self.checks.is_empty()
    }
}

/// Did the merged tract length reach the edge of the searched window?
/// Compared against the current round's nominal flank size.
pub fn reaches_window_edge(tract_len: i64, flank_len: i64, coverage_fraction: f64) -> bool {
    (tract_len as f64) > coverage_fraction * (flank_len as f64)
}

/// Convert a flank-coordinate span into boundary-relative offsets.
/// Up flanks carry the gene at their right edge, so offsets count back from
/// the actual (possibly clamped) flank length.
pub fn tract_from_span(
    gene_id: &str,
    direction: Direction,
    span: (i64, i64),
    flank_actual: i64,
) -> TractRecord {
    let (start, end) = match direction {
        Direction::Up => (flank_actual - span.1, flank_actual - span.0),
        Direction::Down => span,
    };
    TractRecord {
        gene_id: gene_id.to_string(),
        start,
        end,
        direction,
    }
}

fn process_pair<A: Aligner>(
    cfg: &RoundConfig,
    direction: Direction,
    pair: &GenePair,
    genes: &FxHashMap<String, GeneRecord>,
    store: &GenomeStore,
    aligner: &A,
    work_root: &Path,
) -> io::Result<PairResult> {
    let gene_a = genes.get(&pair.gene_a).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("Gene '{}' missing from annotation", pair.gene_a),
        )
    })?;
    let gene_b = genes.get(&pair.gene_b).ok_or_else(|| {
        io::Error::new(
            io::ErrorKind::NotFound,
            format!("Gene '{}' missing from annotation", pair.gene_b),
        )
    })?;

    // EXTRACTED
    let ref_flank = store.fetch_flank(gene_a, direction, cfg.flank_len)?;
    let qry_flank = store.fetch_flank(gene_b, direction, cfg.flank_len)?;

    // ALIGNED: each pair owns its working directory exclusively
    let pair_dir = work_root
        .join(format!("round{}", cfg.round_index))
        .join(&pair.pair_id)
        .join(direction.label());
    let mut rows = aligner.align(&pair_dir, &ref_flank, &qry_flank, cfg.min_identity)?;

    // Rows whose labels fail the join against this pair's flanks are unusable
    let before = rows.len();
    rows.retain(|r| r.ref_label == ref_flank.label && r.query_label == qry_flank.label);
    if rows.len() < before {
        debug!(
            "Pair {} {}: dropped {} rows failing the flank-label join",
            pair.pair_id,
            direction,
            before - rows.len()
        );
    }

    // CLEANED
    let rows = filter_paired_rows(&rows, direction, cfg.tolerance);
    let ref_kept = collapse_nested(&rows, Side::Reference);
    let qry_kept = collapse_nested(&rows, Side::Query);
    let qry_set: FxHashSet<&CoordRow> = qry_kept.iter().collect();
    let rows: Vec<CoordRow> = ref_kept
        .into_iter()
        .filter(|r| qry_set.contains(r))
        .collect();

    // EXTENDED
    let ref_spans: Vec<(i64, i64)> = rows.iter().map(|r| Side::Reference.span(r)).collect();
    let qry_spans: Vec<(i64, i64)> = rows.iter().map(|r| Side::Query.span(r)).collect();
    let ref_ext = extend_toward_boundary(direction, &ref_spans, ref_flank.len(), cfg.max_gap);
    let qry_ext = extend_toward_boundary(direction, &qry_spans, qry_flank.len(), cfg.max_gap);

    let mut tracts = Vec::new();
    let mut checks = Vec::new();

    // MERGED: only rows accepted on both sides feed the per-gene merge
    if let (Some(ref_ext), Some(qry_ext)) = (ref_ext, qry_ext) {
        let ref_chain: FxHashSet<(i64, i64)> = ref_ext.chain.iter().copied().collect();
        let qry_chain: FxHashSet<(i64, i64)> = qry_ext.chain.iter().copied().collect();
        let accepted: Vec<&CoordRow> = rows
            .iter()
            .filter(|r| {
                ref_chain.contains(&Side::Reference.span(r))
                    && qry_chain.contains(&Side::Query.span(r))
            })
            .collect();

        let a_span = merge_spans(
            &accepted
                .iter()
                .map(|r| Side::Reference.span(r))
                .collect::<Vec<_>>(),
        );
        let b_span = merge_spans(
            &accepted
                .iter()
                .map(|r| Side::Query.span(r))
                .collect::<Vec<_>>(),
        );

        if let (Some(a_span), Some(b_span)) = (a_span, b_span) {
            let tract_a = tract_from_span(&gene_a.gene_id, direction, a_span, ref_flank.len());
            let tract_b = tract_from_span(&gene_b.gene_id, direction, b_span, qry_flank.len());

            // CHECKED: both copies still pinned to the window edge means the
            // pair has not converged and must be re-run with a longer flank
            let a_edge = reaches_window_edge(tract_a.length(), cfg.flank_len, cfg.coverage_fraction);
            let b_edge = reaches_window_edge(tract_b.length(), cfg.flank_len, cfg.coverage_fraction);
            if a_edge && b_edge {
                checks.push(CheckRecord {
                    gene_id: gene_a.gene_id.clone(),
                    coverage_length: tract_a.length(),
                    direction,
                    pair_label: pair.label(),
                });
                checks.push(CheckRecord {
                    gene_id: gene_b.gene_id.clone(),
                    coverage_length: tract_b.length(),
                    direction,
                    pair_label: pair.label(),
                });
            }

            tracts.push(tract_a);
            tracts.push(tract_b);
        }
    }

    Ok(PairResult {
        pair: pair.clone(),
        direction,
        tracts,
        checks,
    })
}

/// Run one round for one direction over the current working set.
pub fn run_round<A: Aligner + Sync>(
    cfg: &RoundConfig,
    direction: Direction,
    pairs: &[GenePair],
    genes: &FxHashMap<String, GeneRecord>,
    store: &GenomeStore,
    aligner: &A,
    work_root: &Path,
) -> io::Result<BatchOutcome<PairResult>> {
    run_batch(
        pairs,
        cfg.concurrency,
        |pair| format!("{}:{}:round{}", pair.pair_id, direction, cfg.round_index),
        |pair| process_pair(cfg, direction, pair, genes, store, aligner, work_root),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_window_edge_threshold() {
        // Flank 10000: a 10000-long tract reaches the edge, 9001 exceeds
        // 90%, 8999 does not
        assert!(reaches_window_edge(10000, 10000, 0.9));
        assert!(reaches_window_edge(9001, 10000, 0.9));
        assert!(!reaches_window_edge(8999, 10000, 0.9));
        assert!(!reaches_window_edge(9000, 10000, 0.9));
    }

    #[test]
    fn test_tract_from_span_up_counts_back_from_edge() {
        let tract = tract_from_span("g", Direction::Up, (49_700, 49_900), 50_000);
        assert_eq!((tract.start, tract.end), (100, 300));
        assert_eq!(tract.length(), 200);
    }

    #[test]
    fn test_tract_from_span_down_is_identity() {
        let tract = tract_from_span("g", Direction::Down, (0, 1200), 50_000);
        assert_eq!((tract.start, tract.end), (0, 1200));
    }

    #[test]
    fn test_converged_means_no_checks() {
        let pair = GenePair {
            pair_id: "TD-1".to_string(),
            gene_a: "a".to_string(),
            gene_b: "b".to_string(),
            dup_type: "TD".to_string(),
        };
        let result = PairResult {
            pair,
            direction: Direction::Up,
            tracts: Vec::new(),
            checks: Vec::new(),
        };
        assert!(result.converged());
    }
}
