use crate::model::{Direction, GeneRecord, Strand};
use rust_htslib::faidx;
use rustc_hash::FxHashMap;
use std::cell::RefCell;
use std::collections::HashMap;
use std::io;

// Simple cache for FASTA file handles, one reader per path per thread
struct FaidxCache {
    capacity: usize,
    readers: HashMap<String, faidx::Reader>,
}

impl FaidxCache {
    fn new(capacity: usize) -> Self {
        FaidxCache {
            capacity,
            readers: HashMap::with_capacity(capacity),
        }
    }

    fn get_or_open(&mut self, path: &str) -> io::Result<&mut faidx::Reader> {
        if self.readers.contains_key(path) {
            return Ok(self.readers.get_mut(path).unwrap());
        }

        if self.readers.len() >= self.capacity {
            if let Some(key_to_remove) = self.readers.keys().next().map(|k| k.clone()) {
                self.readers.remove(&key_to_remove);
            }
        }

        let reader = faidx::Reader::from_path(path)
            .map_err(|e| io::Error::other(format!("Failed to open FASTA file '{path}': {e}")))?;

        self.readers.insert(path.to_string(), reader);
        Ok(self.readers.get_mut(path).unwrap())
    }
}

thread_local! {
    // Per-thread cache so concurrent per-pair workers never share a handle
    static FAIDX_CACHE: RefCell<FaidxCache> = RefCell::new(FaidxCache::new(4));
}

pub fn reverse_complement(seq: &[u8]) -> Vec<u8> {
    seq.iter()
        .rev()
        .map(|&base| match base {
            b'A' | b'a' => b'T',
            b'T' | b't' => b'A',
            b'C' | b'c' => b'G',
            b'G' | b'g' => b'C',
            b'N' | b'n' => b'N',
            _ => base,
        })
        .collect()
}

/// A flanking sequence extracted for one gene copy in one round.
///
/// The sequence is oriented so the gene-proximal edge is the right end for
/// Up flanks and the left end for Down flanks, regardless of gene strand
/// (reverse-strand flanks are reverse-complemented at extraction).
#[derive(Debug, Clone)]
pub struct FlankSeq {
    pub label: String,
    pub seq: Vec<u8>,
    pub genomic: (i64, i64),
    pub direction: Direction,
}

impl FlankSeq {
    pub fn len(&self) -> i64 {
        self.seq.len() as i64
    }

    pub fn is_empty(&self) -> bool {
        self.seq.is_empty()
    }
}

/// Read-only genome sequence store over an indexed FASTA, shared across all
/// concurrent workers.
#[derive(Debug)]
pub struct GenomeStore {
    fasta_path: String,
    chrom_lengths: FxHashMap<String, i64>,
}

impl GenomeStore {
    /// Open a genome FASTA, creating the .fai index if absent, and record
    /// chromosome lengths from it.
    pub fn open(fasta_path: &str) -> io::Result<Self> {
        let fai_path = format!("{fasta_path}.fai");
        let fai_content = match std::fs::read_to_string(&fai_path) {
            Ok(content) => content,
            Err(_) => {
                // Opening the reader creates the index as a side effect
                match faidx::Reader::from_path(fasta_path) {
                    Ok(_) => std::fs::read_to_string(&fai_path)?,
                    Err(e) => {
                        return Err(io::Error::other(format!(
                            "Failed to create FASTA index for '{fasta_path}': {e}"
                        )));
                    }
                }
            }
        };

        let mut chrom_lengths = FxHashMap::default();
        for line in fai_content.lines() {
            let fields: Vec<&str> = line.split('\t').collect();
            if fields.len() >= 2 && !fields[0].is_empty() {
                if let Ok(length) = fields[1].parse::<i64>() {
                    chrom_lengths.insert(fields[0].to_string(), length);
                }
            }
        }

        Ok(GenomeStore {
            fasta_path: fasta_path.to_string(),
            chrom_lengths,
        })
    }

    /// Override chromosome lengths with an externally supplied table.
    pub fn set_chrom_lengths(&mut self, lengths: FxHashMap<String, i64>) {
        self.chrom_lengths = lengths;
    }

    pub fn chrom_length(&self, chrom: &str) -> io::Result<i64> {
        self.chrom_lengths.get(chrom).copied().ok_or_else(|| {
            io::Error::new(
                io::ErrorKind::NotFound,
                format!("Chromosome '{chrom}' not found in genome"),
            )
        })
    }

    pub fn chrom_lengths(&self) -> &FxHashMap<String, i64> {
        &self.chrom_lengths
    }

    /// Fetch [start, end) of a chromosome, uppercased.
    pub fn fetch(&self, chrom: &str, start: i64, end: i64) -> io::Result<Vec<u8>> {
        if start < 0 || start >= end {
            return Err(io::Error::new(
                io::ErrorKind::InvalidInput,
                format!("Invalid fetch range {chrom}:{start}-{end}"),
            ));
        }

        FAIDX_CACHE.with(|cache_cell| -> io::Result<Vec<u8>> {
            let mut cache = cache_cell.borrow_mut();
            let reader = cache.get_or_open(&self.fasta_path)?;

            // rust-htslib fetch_seq expects a 0-based inclusive end
            let seq_vec = match reader.fetch_seq(chrom, start as usize, (end - 1) as usize) {
                Ok(seq) => {
                    let mut seq_vec = seq.to_vec();
                    unsafe { libc::free(seq.as_ptr() as *mut std::ffi::c_void) }; // Free up memory to avoid memory leak (bug https://github.com/rust-bio/rust-htslib/issues/401#issuecomment-1704290171)
                    seq_vec
                        .iter_mut()
                        .for_each(|byte| *byte = byte.to_ascii_uppercase());
                    seq_vec
                }
                Err(e) => {
                    return Err(io::Error::other(format!(
                        "Failed to fetch sequence for {chrom}:{start}-{end}: {e}"
                    )))
                }
            };

            Ok(seq_vec)
        })
    }

    /// Genomic window of a gene's flank, clamped to the chromosome.
    pub fn flank_window(
        &self,
        gene: &GeneRecord,
        direction: Direction,
        flank: i64,
    ) -> io::Result<(i64, i64)> {
        let chrom_len = self.chrom_length(&gene.chrom)?;
        let window = match (direction, gene.strand) {
            (Direction::Up, Strand::Forward) | (Direction::Down, Strand::Reverse) => {
                ((gene.start - flank).max(0), gene.start)
            }
            (Direction::Up, Strand::Reverse) | (Direction::Down, Strand::Forward) => {
                (gene.end, (gene.end + flank).min(chrom_len))
            }
        };
        Ok(window)
    }

    /// Extract a gene's flanking sequence for one direction, oriented so the
    /// gene-proximal edge is consistent across strands.
    pub fn fetch_flank(
        &self,
        gene: &GeneRecord,
        direction: Direction,
        flank: i64,
    ) -> io::Result<FlankSeq> {
        let (start, end) = self.flank_window(gene, direction, flank)?;
        if start >= end {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                format!(
                    "Gene '{}' has no {} flank room on {}",
                    gene.gene_id, direction, gene.chrom
                ),
            ));
        }

        let mut seq = self.fetch(&gene.chrom, start, end)?;
        if gene.strand == Strand::Reverse {
            seq = reverse_complement(&seq);
        }

        let label = format!(
            "{}::{}:{}-{}({})",
            gene.gene_id, gene.chrom, start, end, gene.strand
        );
        Ok(FlankSeq {
            label,
            seq,
            genomic: (start, end),
            direction,
        })
    }
}
