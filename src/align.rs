//! Alignment collaborator.
//!
//! The pipeline treats the aligner as a black box behind the `Aligner`
//! trait: hand it two flank sequences and an identity threshold, get back a
//! coordinate table. The production implementation shells out to
//! promer / delta-filter / show-coords inside the pair's working directory;
//! tests substitute an in-process implementation.

use crate::coords::{parse_coords, CoordRow};
use crate::faidx::FlankSeq;
use log::debug;
use std::fs::File;
use std::io::{self, BufReader, Write};
use std::path::Path;
use std::process::{Command, Stdio};

pub const DEFAULT_MIN_IDENTITY: f64 = 80.0;

pub trait Aligner {
    /// Align two flank sequences, returning the cleaned-input coordinate
    /// table. An empty table is a valid result (no detectable homology);
    /// an Err is a per-unit tool failure, absorbed by the round.
    fn align(
        &self,
        work_dir: &Path,
        reference: &FlankSeq,
        query: &FlankSeq,
        min_identity: f64,
    ) -> io::Result<Vec<CoordRow>>;
}

/// Runs promer on the two flanks, filters the delta at the identity
/// threshold, and parses the resulting show-coords table.
#[derive(Debug, Clone)]
pub struct PromerAligner {
    pub promer: String,
    pub delta_filter: String,
    pub show_coords: String,
}

impl Default for PromerAligner {
    fn default() -> Self {
        PromerAligner {
            promer: "promer".to_string(),
            delta_filter: "delta-filter".to_string(),
            show_coords: "show-coords".to_string(),
        }
    }
}

impl PromerAligner {
    /// Verify the external tools respond before any round starts.
    /// Missing dependencies are fatal at startup.
    pub fn check_available(&self) -> io::Result<()> {
        for tool in [&self.promer, &self.delta_filter, &self.show_coords] {
            let status = Command::new(tool)
                .arg("-h")
                .stdout(Stdio::null())
                .stderr(Stdio::null())
                .status()
                .map_err(|e| {
                    io::Error::new(
                        io::ErrorKind::NotFound,
                        format!("Required tool '{}' is not executable: {}", tool, e),
                    )
                })?;
            // MUMmer tools exit non-zero on -h; reaching them is enough
            debug!("Tool '{}' responded with {}", tool, status);
        }
        Ok(())
    }

    fn write_fasta(path: &Path, flank: &FlankSeq) -> io::Result<()> {
        let mut file = File::create(path)?;
        writeln!(file, ">{}", flank.label)?;
        for chunk in flank.seq.chunks(80) {
            file.write_all(chunk)?;
            file.write_all(b"\n")?;
        }
        Ok(())
    }

    fn run_checked(mut cmd: Command, what: &str) -> io::Result<std::process::Output> {
        let output = cmd.output()?;
        if !output.status.success() {
            return Err(io::Error::other(format!(
                "{} failed ({}): {}",
                what,
                output.status,
                String::from_utf8_lossy(&output.stderr)
            )));
        }
        Ok(output)
    }
}

impl Aligner for PromerAligner {
    fn align(
        &self,
        work_dir: &Path,
        reference: &FlankSeq,
        query: &FlankSeq,
        min_identity: f64,
    ) -> io::Result<Vec<CoordRow>> {
        std::fs::create_dir_all(work_dir)?;
        let ref_fa = work_dir.join("ref.fa");
        let qry_fa = work_dir.join("qry.fa");
        Self::write_fasta(&ref_fa, reference)?;
        Self::write_fasta(&qry_fa, query)?;

        let prefix = work_dir.join("aln");
        let mut promer = Command::new(&self.promer);
        promer
            .arg("--mum")
            .arg("-p")
            .arg(&prefix)
            .arg(&ref_fa)
            .arg(&qry_fa)
            .stdout(Stdio::null())
            .stderr(Stdio::piped());
        Self::run_checked(promer, "promer")?;

        let delta = work_dir.join("aln.delta");
        let mut filter = Command::new(&self.delta_filter);
        filter
            .arg("-i")
            .arg(format!("{}", min_identity))
            .arg(&delta)
            .stderr(Stdio::piped());
        let filtered = Self::run_checked(filter, "delta-filter")?;
        let filter_path = work_dir.join("aln.filter");
        std::fs::write(&filter_path, &filtered.stdout)?;

        let mut coords = Command::new(&self.show_coords);
        coords
            .arg("-rclTH")
            .arg(&filter_path)
            .stderr(Stdio::piped());
        let table = Self::run_checked(coords, "show-coords")?;
        let coords_path = work_dir.join("aln.coords");
        std::fs::write(&coords_path, &table.stdout)?;

        let rows = parse_coords(BufReader::new(File::open(&coords_path)?))?;
        debug!(
            "Aligned {} vs {}: {} coordinate rows",
            reference.label,
            query.label,
            rows.len()
        );
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::Direction;

    #[test]
    fn test_write_fasta_wraps_lines() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("x.fa");
        let flank = FlankSeq {
            label: "g1::chr1:0-200(+)".to_string(),
            seq: vec![b'A'; 200],
            genomic: (0, 200),
            direction: Direction::Up,
        };
        PromerAligner::write_fasta(&path, &flank).unwrap();
        let text = std::fs::read_to_string(&path).unwrap();
        let mut lines = text.lines();
        assert_eq!(lines.next(), Some(">g1::chr1:0-200(+)"));
        assert!(lines.all(|l| l.len() <= 80));
    }

    #[test]
    fn test_missing_tool_is_reported() {
        let aligner = PromerAligner {
            promer: "definitely-not-a-real-promer".to_string(),
            ..Default::default()
        };
        assert!(aligner.check_available().is_err());
    }
}
