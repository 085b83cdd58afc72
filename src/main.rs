//! Checks the blocked algorithm against the unblocked reference on the
//! standard batch grid, for every scalar type, layout and real transpose
//! combination.
//!
//! Usage: `tilegemm [--quick]`. `--quick` skips the largest batch.
//! Log verbosity follows `RUST_LOG` (default `info`).

use std::process::ExitCode;

use num::complex::{Complex32, Complex64};
use tilegemm::verify::{compare_algorithms, Report, Scenario};
use tilegemm::{Layout, Result, Scalar, Trans};
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

/// `(batch size, block size)` pairs.
const GRID: [(usize, usize); 4] = [(0, 10), (10, 15), (1024, 9), (132231, 3)];
const QUICK_LIMIT: usize = 10_000;

const ALPHA: f64 = 1.5;
const BETA: f64 = 3.0;

fn scenarios(quick: bool) -> Vec<Scenario> {
    let mut out = Vec::new();
    for (len, blk) in GRID {
        if quick && len > QUICK_LIMIT {
            continue;
        }
        for layout in [Layout::Right, Layout::Left] {
            for trans_a in Trans::REAL {
                for trans_b in Trans::REAL {
                    out.push(
                        Scenario::new(len, blk)
                            .with_layout(layout)
                            .with_trans(trans_a, trans_b),
                    );
                }
            }
        }
    }
    out
}

fn run_type<T: Scalar, S: Into<T> + Copy>(
    label: &str,
    scenarios: &[Scenario],
    alpha: S,
    beta: S,
) -> Result<Vec<Report>> {
    info!(scalar = label, count = scenarios.len(), "running scenarios");
    scenarios
        .iter()
        .map(|scenario| {
            let report = compare_algorithms::<T, S>(scenario, alpha, beta)?;
            if report.passed() {
                info!(scalar = label, "{report}");
            } else {
                error!(scalar = label, "{report}");
            }
            Ok(report)
        })
        .collect()
}

fn run(quick: bool) -> Result<usize> {
    let scenarios = scenarios(quick);
    let mut reports = Vec::new();
    reports.extend(run_type::<f32, f32>("f32", &scenarios, ALPHA as f32, BETA as f32)?);
    reports.extend(run_type::<f64, f64>("f64", &scenarios, ALPHA, BETA)?);
    reports.extend(run_type::<Complex32, f32>("c32", &scenarios, ALPHA as f32, BETA as f32)?);
    // Complex values with real coefficients.
    reports.extend(run_type::<Complex64, f64>("c64", &scenarios, ALPHA, BETA)?);
    reports.extend(run_type::<Complex64, Complex64>(
        "c64 (complex scalars)",
        &scenarios,
        Complex64::new(ALPHA, -0.5),
        Complex64::new(BETA, 0.25),
    )?);

    let failed = reports.iter().filter(|r| !r.passed()).count();
    println!("{} scenarios, {} passed, {failed} failed", reports.len(), reports.len() - failed);
    Ok(failed)
}

fn main() -> ExitCode {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let quick = std::env::args().skip(1).any(|arg| arg == "--quick");
    match run(quick) {
        Ok(0) => ExitCode::SUCCESS,
        Ok(_) => ExitCode::FAILURE,
        Err(err) => {
            error!("verification aborted: {err}");
            ExitCode::FAILURE
        }
    }
}
