//! Multi-round driver.
//!
//! Runs the round orchestrator over a monotonically increasing flank-size
//! schedule, once per direction. Round 1 works on every duplicate pair;
//! round N+1's working set is exactly the pairs that produced a CheckRecord
//! in round N. A pair's final homology extent is taken from the first round
//! in which it converged; pairs still unconverged after the last round are
//! collected into the discard set and excluded from final output.

use crate::align::Aligner;
use crate::faidx::GenomeStore;
use crate::model::{Direction, GenePair, GeneRecord, TractRecord};
use crate::project::{breakpoint, project_tract};
use crate::round::{run_round, RoundConfig};
use log::{debug, info, warn};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{self, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

pub const DEFAULT_ROUNDS: usize = 10;
pub const DEFAULT_COVERAGE_FRACTION: f64 = 0.9;
pub const CHECKPOINT_FILE: &str = "dupflank.ckpt";

/// Flank sizes for an n-round schedule: geometric doubling ending at the
/// configured maximum, so size_i = round(max / 2^(n-i)) and size_n = max.
pub fn flank_schedule(max_flank: i64, rounds: usize) -> Vec<i64> {
    (1..=rounds)
        .map(|i| {
            if i == rounds {
                max_flank
            } else {
                let divisor = 2f64.powi((rounds - i) as i32);
                (max_flank as f64 / divisor).round() as i64
            }
        })
        .collect()
}

#[derive(Debug, Clone)]
pub struct PipelineConfig {
    pub flank_sizes: Vec<i64>,
    pub min_identity: f64,
    pub tolerance: i64,
    pub max_gap: i64,
    pub coverage_fraction: f64,
    pub concurrency: usize,
    pub work_dir: PathBuf,
    pub out_dir: PathBuf,
}

/// A pair finalized in the first round where it converged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinalizedPair {
    pub pair: GenePair,
    pub direction: Direction,
    pub round_index: usize,
    pub tracts: Vec<TractRecord>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RoundSummary {
    pub round_index: usize,
    pub direction: Direction,
    pub flank_len: i64,
    pub working_set: usize,
    pub converged: usize,
    pub carried: usize,
    pub failed: usize,
}

/// Everything needed to regenerate final outputs without re-aligning.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Checkpoint {
    pub genes: FxHashMap<String, GeneRecord>,
    pub chrom_lengths: FxHashMap<String, i64>,
    pub finalized: Vec<FinalizedPair>,
    pub discarded: Vec<(String, Direction)>,
    pub rounds: Vec<RoundSummary>,
    pub failures: Vec<(String, String)>,
}

pub struct MultiRoundPipeline<'a, A: Aligner + Sync> {
    cfg: PipelineConfig,
    genes: FxHashMap<String, GeneRecord>,
    pairs: Vec<GenePair>,
    store: &'a GenomeStore,
    aligner: &'a A,
}

impl<'a, A: Aligner + Sync> MultiRoundPipeline<'a, A> {
    /// Validate all inputs up front; setup errors are the only fatal ones.
    pub fn new(
        cfg: PipelineConfig,
        genes: Vec<GeneRecord>,
        pairs: Vec<GenePair>,
        store: &'a GenomeStore,
        aligner: &'a A,
    ) -> io::Result<Self> {
        if cfg.flank_sizes.is_empty() {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                "Flank-size schedule is empty",
            ));
        }
        if cfg.flank_sizes.windows(2).any(|w| w[0] >= w[1]) || cfg.flank_sizes[0] <= 0 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!(
                    "Flank-size schedule must be positive and strictly increasing: {:?}",
                    cfg.flank_sizes
                ),
            ));
        }
        if !(0.0..=1.0).contains(&cfg.coverage_fraction) {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Coverage fraction {} not in [0, 1]", cfg.coverage_fraction),
            ));
        }

        let gene_map: FxHashMap<String, GeneRecord> = genes
            .into_iter()
            .map(|g| (g.gene_id.clone(), g))
            .collect();

        let mut seen_pairs = FxHashSet::default();
        for pair in &pairs {
            if !seen_pairs.insert(pair.pair_id.clone()) {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("Duplicate pair id '{}'", pair.pair_id),
                ));
            }
            for gene_id in [&pair.gene_a, &pair.gene_b] {
                let gene = gene_map.get(gene_id).ok_or_else(|| {
                    io::Error::new(
                        io::ErrorKind::InvalidInput,
                        format!(
                            "Pair '{}' references gene '{}' missing from the annotation",
                            pair.pair_id, gene_id
                        ),
                    )
                })?;
                store.chrom_length(&gene.chrom)?;
            }
        }

        Ok(MultiRoundPipeline {
            cfg,
            genes: gene_map,
            pairs,
            store,
            aligner,
        })
    }

    /// Run all rounds for both directions, write accumulation files, the
    /// checkpoint, and the final outputs.
    pub fn run(&self) -> io::Result<Checkpoint> {
        std::fs::create_dir_all(&self.cfg.work_dir)?;
        std::fs::create_dir_all(&self.cfg.out_dir)?;

        let mut ckpt = Checkpoint {
            genes: self.genes.clone(),
            chrom_lengths: self.store.chrom_lengths().clone(),
            ..Default::default()
        };

        for direction in [Direction::Up, Direction::Down] {
            self.run_direction(direction, &mut ckpt)?;
        }

        save_checkpoint(&ckpt, &self.cfg.out_dir.join(CHECKPOINT_FILE))?;
        write_final_outputs(&ckpt, &self.cfg.out_dir)?;

        info!(
            "Finalized {} pair-direction extents, discarded {} for non-convergence",
            ckpt.finalized.len(),
            ckpt.discarded.len()
        );
        Ok(ckpt)
    }

    fn run_direction(&self, direction: Direction, ckpt: &mut Checkpoint) -> io::Result<()> {
        let mut working: Vec<GenePair> = self.pairs.clone();

        for (idx, &flank_len) in self.cfg.flank_sizes.iter().enumerate() {
            if working.is_empty() {
                break;
            }
            let round_index = idx + 1;
            let round_cfg = RoundConfig {
                round_index,
                flank_len,
                min_identity: self.cfg.min_identity,
                tolerance: self.cfg.tolerance,
                max_gap: self.cfg.max_gap,
                coverage_fraction: self.cfg.coverage_fraction,
                concurrency: self.cfg.concurrency,
            };
            info!(
                "Round {} ({}): flank {} bp, {} pairs",
                round_index,
                direction,
                flank_len,
                working.len()
            );

            let outcome = run_round(
                &round_cfg,
                direction,
                &working,
                &self.genes,
                self.store,
                self.aligner,
                &self.cfg.work_dir,
            )?;

            self.write_round_tracts(direction, round_index, &outcome.results)?;

            // Round N+1's working set is exactly the pairs that produced a
            // CheckRecord in round N; the rest are finalized here.
            let mut carried = Vec::new();
            let mut converged = 0usize;
            for result in outcome.results {
                if result.converged() {
                    converged += 1;
                    ckpt.finalized.push(FinalizedPair {
                        pair: result.pair,
                        direction,
                        round_index,
                        tracts: result.tracts,
                    });
                } else {
                    debug!(
                        "Pair {} {} still bound by the {} bp window",
                        result.pair.pair_id, direction, flank_len
                    );
                    carried.push(result.pair);
                }
            }

            ckpt.rounds.push(RoundSummary {
                round_index,
                direction,
                flank_len,
                working_set: working.len(),
                converged,
                carried: carried.len(),
                failed: outcome.failures.len(),
            });
            ckpt.failures.extend(outcome.failures);
            working = carried;
        }

        if !working.is_empty() {
            warn!(
                "{} pairs never converged {} within the schedule; discarding",
                working.len(),
                direction
            );
            for pair in working {
                ckpt.discarded.push((pair.pair_id, direction));
            }
        }
        Ok(())
    }

    fn write_round_tracts(
        &self,
        direction: Direction,
        round_index: usize,
        results: &[crate::round::PairResult],
    ) -> io::Result<()> {
        let path = self
            .cfg
            .out_dir
            .join(format!("tracts.{}.round{}.txt", direction, round_index));
        let mut writer = BufWriter::new(File::create(&path)?);
        for result in results {
            for tract in &result.tracts {
                writeln!(
                    writer,
                    "{}\t{}\t{}\t{}\tround{}",
                    tract.gene_id, tract.start, tract.end, tract.direction, round_index
                )?;
            }
        }
        Ok(())
    }
}

pub fn save_checkpoint(ckpt: &Checkpoint, path: &Path) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    bincode::serde::encode_into_std_write(ckpt, &mut writer, bincode::config::standard()).map_err(
        |e| {
            io::Error::other(format!(
                "Failed to serialize checkpoint to '{}': {:?}",
                path.display(),
                e
            ))
        },
    )?;
    Ok(())
}

pub fn load_checkpoint(path: &Path) -> io::Result<Checkpoint> {
    let mut reader = BufReader::new(File::open(path)?);
    bincode::serde::decode_from_std_read(&mut reader, bincode::config::standard()).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!(
                "Failed to deserialize checkpoint from '{}': {:?}",
                path.display(),
                e
            ),
        )
    })
}

struct BedLine {
    chrom: String,
    start: i64,
    end: i64,
    pair_label: String,
    gene_id: String,
    strand: char,
    pair_id: String,
}

/// Sort by pair id as a version string, then strand descending.
fn sort_bed_lines(lines: &mut [BedLine]) {
    lines.sort_by(|a, b| {
        natord::compare(&a.pair_id, &b.pair_id).then(b.strand.cmp(&a.strand))
    });
}

fn write_bed_lines(path: &Path, lines: &[BedLine]) -> io::Result<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    for line in lines {
        writeln!(
            writer,
            "{}\t{}\t{}\t{}\t{}\t{}\t{}",
            line.chrom, line.start, line.end, line.pair_label, line.gene_id, line.strand,
            line.pair_id
        )?;
    }
    Ok(())
}

/// Project all finalized tracts back to genome coordinates and write the
/// combined sorted BED, breakpoint, and discard files.
pub fn write_final_outputs(ckpt: &Checkpoint, out_dir: &Path) -> io::Result<()> {
    let discarded: FxHashSet<(&str, Direction)> = ckpt
        .discarded
        .iter()
        .map(|(id, d)| (id.as_str(), *d))
        .collect();

    for direction in [Direction::Up, Direction::Down] {
        let mut lines = Vec::new();
        for finalized in &ckpt.finalized {
            if finalized.direction != direction
                || discarded.contains(&(finalized.pair.pair_id.as_str(), direction))
            {
                continue;
            }
            for tract in &finalized.tracts {
                let Some(gene) = ckpt.genes.get(&tract.gene_id) else {
                    warn!("Tract references unknown gene '{}'", tract.gene_id);
                    continue;
                };
                let chrom_len = ckpt
                    .chrom_lengths
                    .get(&gene.chrom)
                    .copied()
                    .unwrap_or(i64::MAX);
                let (start, end) = project_tract(tract, gene, chrom_len);
                lines.push(BedLine {
                    chrom: gene.chrom.clone(),
                    start,
                    end,
                    pair_label: finalized.pair.label(),
                    gene_id: gene.gene_id.clone(),
                    strand: gene.strand.as_char(),
                    pair_id: finalized.pair.pair_id.clone(),
                });
            }
        }
        sort_bed_lines(&mut lines);
        let name = format!("Dupgene.{}.bed", direction);
        write_bed_lines(&out_dir.join(name), &lines)?;
    }

    // Breakpoints: both directions collapsed to gene-proximal points
    let mut bp_lines = Vec::new();
    for finalized in &ckpt.finalized {
        if discarded.contains(&(finalized.pair.pair_id.as_str(), finalized.direction)) {
            continue;
        }
        for tract in &finalized.tracts {
            let Some(gene) = ckpt.genes.get(&tract.gene_id) else {
                continue;
            };
            let point = breakpoint(tract.direction, gene, (tract.start, tract.end));
            bp_lines.push(BedLine {
                chrom: gene.chrom.clone(),
                start: point,
                end: point,
                pair_label: finalized.pair.label(),
                gene_id: gene.gene_id.clone(),
                strand: gene.strand.as_char(),
                pair_id: finalized.pair.pair_id.clone(),
            });
        }
    }
    sort_bed_lines(&mut bp_lines);
    write_bed_lines(&out_dir.join("Dupgene.up_down.breakpoint.txt"), &bp_lines)?;

    let mut filter_writer = BufWriter::new(File::create(out_dir.join("filter.id"))?);
    for (pair_id, direction) in &ckpt.discarded {
        writeln!(filter_writer, "{}\t{}", pair_id, direction)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Strand;

    #[test]
    fn test_flank_schedule_matches_doubling_sequence() {
        let schedule = flank_schedule(3_000_000, 10);
        assert_eq!(
            schedule,
            vec![
                5859, 11719, 23438, 46875, 93750, 187500, 375000, 750000, 1_500_000, 3_000_000
            ]
        );
    }

    #[test]
    fn test_flank_schedule_short() {
        assert_eq!(flank_schedule(1000, 1), vec![1000]);
        assert_eq!(flank_schedule(1000, 2), vec![500, 1000]);
    }

    #[test]
    fn test_bed_sort_order() {
        let mut lines = vec![
            BedLine {
                chrom: "chr1".into(),
                start: 0,
                end: 1,
                pair_label: "x".into(),
                gene_id: "g".into(),
                strand: '+',
                pair_id: "TD-10".into(),
            },
            BedLine {
                chrom: "chr1".into(),
                start: 0,
                end: 1,
                pair_label: "x".into(),
                gene_id: "g".into(),
                strand: '+',
                pair_id: "TD-2".into(),
            },
            BedLine {
                chrom: "chr1".into(),
                start: 0,
                end: 1,
                pair_label: "x".into(),
                gene_id: "g".into(),
                strand: '-',
                pair_id: "TD-2".into(),
            },
        ];
        sort_bed_lines(&mut lines);
        // Version-string order puts TD-2 before TD-10; '-' sorts before '+'
        assert_eq!(lines[0].pair_id, "TD-2");
        assert_eq!(lines[0].strand, '-');
        assert_eq!(lines[1].strand, '+');
        assert_eq!(lines[2].pair_id, "TD-10");
    }

    #[test]
    fn test_checkpoint_roundtrip() {
        let mut genes = FxHashMap::default();
        genes.insert(
            "g1".to_string(),
            GeneRecord {
                gene_id: "g1".to_string(),
                chrom: "chr1".to_string(),
                start: 1000,
                end: 1200,
                strand: Strand::Forward,
            },
        );
        let ckpt = Checkpoint {
            genes,
            chrom_lengths: FxHashMap::default(),
            finalized: vec![FinalizedPair {
                pair: GenePair {
                    pair_id: "TD-1".to_string(),
                    gene_a: "g1".to_string(),
                    gene_b: "g2".to_string(),
                    dup_type: "TD".to_string(),
                },
                direction: Direction::Up,
                round_index: 2,
                tracts: vec![TractRecord {
                    gene_id: "g1".to_string(),
                    start: 100,
                    end: 300,
                    direction: Direction::Up,
                }],
            }],
            discarded: vec![("TD-9".to_string(), Direction::Down)],
            rounds: Vec::new(),
            failures: Vec::new(),
        };

        let bytes =
            bincode::serde::encode_to_vec(&ckpt, bincode::config::standard()).unwrap();
        let (decoded, _): (Checkpoint, usize) =
            bincode::serde::decode_from_slice(&bytes, bincode::config::standard()).unwrap();
        assert_eq!(decoded.finalized.len(), 1);
        assert_eq!(decoded.finalized[0].round_index, 2);
        assert_eq!(decoded.discarded, ckpt.discarded);
        assert_eq!(decoded.genes.get("g1"), ckpt.genes.get("g1"));
    }
}
