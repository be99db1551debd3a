//! Input-table parsing: gene annotation BED, duplicate-pair table, and the
//! chromosome-length table. All coordinates are 0-based half-open.

use crate::model::{GenePair, GeneRecord, Strand};
use rustc_hash::FxHashMap;
use std::fs::File;
use std::io::{self, BufRead, BufReader, Error as IoError};
use std::num::ParseIntError;

#[derive(Debug)]
pub enum ParseErr {
    NotEnoughFields,
    IoError(IoError),
    InvalidField(ParseIntError),
    InvalidStrand,
    InvalidFormat(String),
}

impl std::fmt::Display for ParseErr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseErr::NotEnoughFields => write!(f, "Not enough fields in record"),
            ParseErr::IoError(e) => write!(f, "IO error: {}", e),
            ParseErr::InvalidField(e) => write!(f, "Invalid field: {}", e),
            ParseErr::InvalidStrand => write!(f, "Invalid strand"),
            ParseErr::InvalidFormat(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for ParseErr {}

/// Parse a single BED line: chrom, start, end, gene_id, score, strand.
fn parse_bed_line(line: &str) -> Result<GeneRecord, ParseErr> {
    let fields: Vec<&str> = line.split('\t').collect();
    if fields.len() < 6 {
        return Err(ParseErr::NotEnoughFields);
    }

    let start = fields[1].parse::<i64>().map_err(ParseErr::InvalidField)?;
    let end = fields[2].parse::<i64>().map_err(ParseErr::InvalidField)?;
    if start >= end {
        return Err(ParseErr::InvalidFormat(format!(
            "Gene '{}' has start >= end ({} >= {})",
            fields[3], start, end
        )));
    }
    let strand_char = fields[5]
        .chars()
        .next()
        .ok_or(ParseErr::InvalidStrand)?;
    let strand = Strand::from_char(strand_char).ok_or(ParseErr::InvalidStrand)?;

    Ok(GeneRecord {
        gene_id: fields[3].to_string(),
        chrom: fields[0].to_string(),
        start,
        end,
        strand,
    })
}

pub fn parse_gene_bed<R: BufRead>(reader: R) -> Result<Vec<GeneRecord>, ParseErr> {
    let mut genes = Vec::new();
    for line_result in reader.lines() {
        let line = line_result.map_err(ParseErr::IoError)?;
        let trimmed = line.trim_end();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        genes.push(parse_bed_line(trimmed)?);
    }
    Ok(genes)
}

/// Parse the duplicate-pair table: pair_id, gene_a, gene_b, type.
pub fn parse_pair_table<R: BufRead>(reader: R) -> Result<Vec<GenePair>, ParseErr> {
    let mut pairs = Vec::new();
    for line_result in reader.lines() {
        let line = line_result.map_err(ParseErr::IoError)?;
        let trimmed = line.trim_end();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = trimmed.split('\t').collect();
        if fields.len() < 4 {
            return Err(ParseErr::NotEnoughFields);
        }
        if fields[1] == fields[2] {
            return Err(ParseErr::InvalidFormat(format!(
                "Pair '{}' lists the same gene twice",
                fields[0]
            )));
        }
        pairs.push(GenePair {
            pair_id: fields[0].to_string(),
            gene_a: fields[1].to_string(),
            gene_b: fields[2].to_string(),
            dup_type: fields[3].to_string(),
        });
    }
    Ok(pairs)
}

/// Parse the chromosome-length table: name, length.
pub fn parse_chrom_lengths<R: BufRead>(reader: R) -> Result<FxHashMap<String, i64>, ParseErr> {
    let mut lengths = FxHashMap::default();
    for line_result in reader.lines() {
        let line = line_result.map_err(ParseErr::IoError)?;
        let trimmed = line.trim_end();
        if trimmed.is_empty() || trimmed.starts_with('#') {
            continue;
        }
        let fields: Vec<&str> = trimmed.split('\t').collect();
        if fields.len() < 2 {
            return Err(ParseErr::NotEnoughFields);
        }
        let len = fields[1].parse::<i64>().map_err(ParseErr::InvalidField)?;
        lengths.insert(fields[0].to_string(), len);
    }
    Ok(lengths)
}

pub fn load_gene_bed(path: &str) -> io::Result<Vec<GeneRecord>> {
    let file = File::open(path)
        .map_err(|e| io::Error::new(e.kind(), format!("Failed to open gene BED '{}': {}", path, e)))?;
    parse_gene_bed(BufReader::new(file)).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Failed to parse gene BED '{}': {}", path, e),
        )
    })
}

pub fn load_pair_table(path: &str) -> io::Result<Vec<GenePair>> {
    let file = File::open(path).map_err(|e| {
        io::Error::new(e.kind(), format!("Failed to open pair table '{}': {}", path, e))
    })?;
    parse_pair_table(BufReader::new(file)).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Failed to parse pair table '{}': {}", path, e),
        )
    })
}

pub fn load_chrom_lengths(path: &str) -> io::Result<FxHashMap<String, i64>> {
    let file = File::open(path).map_err(|e| {
        io::Error::new(
            e.kind(),
            format!("Failed to open chromosome length table '{}': {}", path, e),
        )
    })?;
    parse_chrom_lengths(BufReader::new(file)).map_err(|e| {
        io::Error::new(
            io::ErrorKind::InvalidData,
            format!("Failed to parse chromosome length table '{}': {}", path, e),
        )
    })
}
