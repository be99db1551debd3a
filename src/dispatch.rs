//! Bounded parallel dispatch for independent per-pair work units.
//!
//! Replaces the external batch runner: all units execute on a local rayon
//! pool with the configured concurrency, individual failures are absorbed
//! into a diagnostics list, and the batch never aborts early.

use log::warn;
use rayon::prelude::*;
use std::io;

/// Outcome of one batch: successful results plus (label, error) diagnostics
/// for failed units.
#[derive(Debug)]
pub struct BatchOutcome<T> {
    pub results: Vec<T>,
    pub failures: Vec<(String, String)>,
}

/// Run all units with bounded concurrency. Order of `results` follows unit
/// order with failed units removed.
pub fn run_batch<U, T, L, F>(
    units: &[U],
    concurrency: usize,
    label: L,
    work: F,
) -> io::Result<BatchOutcome<T>>
where
    U: Sync,
    T: Send,
    L: Fn(&U) -> String + Sync,
    F: Fn(&U) -> io::Result<T> + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(concurrency.max(1))
        .build()
        .map_err(|e| io::Error::other(format!("Failed to build worker pool: {e}")))?;

    let outcomes: Vec<Result<T, (String, String)>> = pool.install(|| {
        units
            .par_iter()
            .map(|unit| work(unit).map_err(|e| (label(unit), e.to_string())))
            .collect()
    });

    let mut results = Vec::with_capacity(outcomes.len());
    let mut failures = Vec::new();
    for outcome in outcomes {
        match outcome {
            Ok(value) => results.push(value),
            Err((unit_label, error)) => {
                warn!("Unit '{}' failed: {}", unit_label, error);
                failures.push((unit_label, error));
            }
        }
    }
    Ok(BatchOutcome { results, failures })
}
