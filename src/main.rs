use clap::Parser;
use dupflank::align::{PromerAligner, DEFAULT_MIN_IDENTITY};
use dupflank::bed;
use dupflank::faidx::GenomeStore;
use dupflank::pipeline::{
    flank_schedule, load_checkpoint, write_final_outputs, MultiRoundPipeline, PipelineConfig,
    DEFAULT_COVERAGE_FRACTION, DEFAULT_ROUNDS,
};
use log::info;
use rayon::ThreadPoolBuilder;
use std::io;
use std::num::NonZeroUsize;
use std::path::PathBuf;

/// Common options shared between all commands
#[derive(Parser, Debug)]
struct CommonOpts {
    /// Number of threads for parallel processing.
    #[clap(short = 't', long, value_parser, default_value_t = NonZeroUsize::new(num_cpus::get().max(1)).unwrap())]
    num_threads: NonZeroUsize,

    /// Verbosity level (0 = error, 1 = info, 2 = debug)
    #[clap(short, long, default_value = "0")]
    verbose: u8,
}

/// Classify how far homology extends around duplicated gene pairs.
#[derive(Parser, Debug)]
#[command(author, version, about, disable_help_subcommand = true)]
enum Args {
    /// Run the multi-round flanking-homology pipeline
    Run {
        #[clap(flatten)]
        common: CommonOpts,

        /// Gene annotation BED (chrom, start, end, gene_id, score, strand)
        #[clap(short = 'b', long, value_parser)]
        gene_bed: String,

        /// Duplicate-pair table (pair_id, gene_a, gene_b, type)
        #[clap(short = 'p', long, value_parser)]
        pairs: String,

        /// Genome FASTA (indexed, or indexable)
        #[clap(short = 'g', long, value_parser)]
        genome: String,

        /// Optional chromosome-length table overriding the FASTA index
        #[clap(long, value_parser)]
        chrom_lengths: Option<String>,

        /// Maximum flank size explored by the last round
        #[clap(short = 'M', long, value_parser, default_value_t = 3_000_000)]
        max_flank: i64,

        /// Number of rounds in the doubling schedule
        #[clap(short = 'r', long, value_parser, default_value_t = DEFAULT_ROUNDS)]
        rounds: usize,

        /// Explicit comma-separated flank sizes (overrides --max-flank/--rounds)
        #[clap(long, value_parser)]
        flank_sizes: Option<String>,

        /// Identity threshold for delta-filtering alignments
        #[clap(short = 'i', long, value_parser, default_value_t = DEFAULT_MIN_IDENTITY)]
        min_identity: f64,

        /// Outlier window around the filter anchor
        #[clap(long, value_parser, default_value_t = dupflank::filter::DEFAULT_TOLERANCE)]
        tolerance: i64,

        /// Maximum gap joining consecutive spans into one extension
        #[clap(short = 'd', long, value_parser, default_value_t = dupflank::extend::DEFAULT_MAX_GAP)]
        max_gap: i64,

        /// Tract-over-flank fraction treated as reaching the window edge
        #[clap(long, value_parser, default_value_t = DEFAULT_COVERAGE_FRACTION)]
        coverage_fraction: f64,

        /// Working directory for per-pair alignment scratch
        #[clap(short = 'w', long, value_parser, default_value = "dupflank_work")]
        work_dir: PathBuf,

        /// Output directory
        #[clap(short = 'o', long, value_parser, default_value = "dupflank_out")]
        out_dir: PathBuf,
    },
    /// Print the flank-size schedule for a maximum size and round count
    Flanks {
        /// Maximum flank size explored by the last round
        #[clap(short = 'M', long, value_parser)]
        max_flank: i64,

        /// Number of rounds
        #[clap(short = 'r', long, value_parser, default_value_t = DEFAULT_ROUNDS)]
        rounds: usize,
    },
    /// Regenerate final outputs from a checkpoint without re-aligning
    Report {
        #[clap(flatten)]
        common: CommonOpts,

        /// Path to the checkpoint written by `run`
        #[clap(short = 'c', long, value_parser)]
        checkpoint: PathBuf,

        /// Output directory
        #[clap(short = 'o', long, value_parser, default_value = "dupflank_out")]
        out_dir: PathBuf,
    },
}

fn main() -> io::Result<()> {
    let args = Args::parse();

    match args {
        Args::Run {
            common,
            gene_bed,
            pairs,
            genome,
            chrom_lengths,
            max_flank,
            rounds,
            flank_sizes,
            min_identity,
            tolerance,
            max_gap,
            coverage_fraction,
            work_dir,
            out_dir,
        } => {
            init_runtime(&common)?;

            let genes = bed::load_gene_bed(&gene_bed)?;
            let pair_list = bed::load_pair_table(&pairs)?;
            let mut store = GenomeStore::open(&genome)?;
            if let Some(path) = chrom_lengths {
                store.set_chrom_lengths(bed::load_chrom_lengths(&path)?);
            }
            info!(
                "Loaded {} genes, {} duplicate pairs",
                genes.len(),
                pair_list.len()
            );

            let schedule = match flank_sizes {
                Some(list) => parse_flank_sizes(&list)?,
                None => flank_schedule(max_flank, rounds),
            };
            info!("Flank schedule: {:?}", schedule);

            let aligner = PromerAligner::default();
            aligner.check_available()?;

            let cfg = PipelineConfig {
                flank_sizes: schedule,
                min_identity,
                tolerance,
                max_gap,
                coverage_fraction,
                concurrency: common.num_threads.into(),
                work_dir,
                out_dir,
            };
            let pipeline = MultiRoundPipeline::new(cfg, genes, pair_list, &store, &aligner)?;
            let ckpt = pipeline.run()?;
            if !ckpt.failures.is_empty() {
                info!(
                    "{} work units failed and were absorbed as zero-result",
                    ckpt.failures.len()
                );
            }
        }
        Args::Flanks { max_flank, rounds } => {
            for size in flank_schedule(max_flank, rounds) {
                println!("{}", size);
            }
        }
        Args::Report {
            common,
            checkpoint,
            out_dir,
        } => {
            init_runtime(&common)?;
            let ckpt = load_checkpoint(&checkpoint)?;
            std::fs::create_dir_all(&out_dir)?;
            write_final_outputs(&ckpt, &out_dir)?;
            info!(
                "Rewrote outputs for {} finalized pair-direction extents",
                ckpt.finalized.len()
            );
        }
    }

    Ok(())
}

/// Initialize logger and global thread pool based on common options
fn init_runtime(common: &CommonOpts) -> io::Result<()> {
    env_logger::Builder::new()
        .filter_level(match common.verbose {
            0 => log::LevelFilter::Error,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .init();

    ThreadPoolBuilder::new()
        .num_threads(common.num_threads.into())
        .build_global()
        .map_err(|e| io::Error::other(format!("Failed to build global thread pool: {e}")))
}

fn parse_flank_sizes(list: &str) -> io::Result<Vec<i64>> {
    list.split(',')
        .map(|s| {
            s.trim().parse::<i64>().map_err(|_| {
                io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("Invalid flank size '{}'", s),
                )
            })
        })
        .collect()
}
