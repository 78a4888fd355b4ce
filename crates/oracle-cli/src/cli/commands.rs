use super::CliError;
use super::helpers::{RunSummary, render_timing, write_run_summary};
use anyhow::Context;
use oracle_core::common::{DEFAULT_DELTA, OracleConfig};
use oracle_core::domain::{Outcome, PtracFormat};
use oracle_core::geometry::{BoxGeometry, VolumeEngine};
use oracle_core::mcnp::parse_mcnp_file;
use oracle_core::oracle::EquivalenceOracle;
use oracle_core::ptrac::open_ptrac;
use oracle_core::run_comparison;
use oracle_core::statistics::{Statistics, failed_points_path};
use std::path::PathBuf;
use std::time::Instant;

#[derive(clap::Args)]
pub(super) struct CompareArgs {
    /// Tripoli-4 side of the comparison (box geometry JSON)
    #[arg(value_name = "T4_GEOMETRY")]
    geometry: PathBuf,

    /// MCNP input deck
    #[arg(value_name = "MCNP_INPUT")]
    mcnp_input: PathBuf,

    /// MCNP PTRAC file
    #[arg(value_name = "PTRAC")]
    ptrac: PathBuf,

    /// Maximum number of sampled points
    #[arg(long, value_name = "N")]
    npts: Option<u64>,

    /// Surface distance under which a material mismatch is ignored
    #[arg(long, default_value_t = DEFAULT_DELTA)]
    delta: f64,

    /// Learn material associations from the first occurrence of each MCNP material
    #[arg(long)]
    guess_material_assocs: bool,

    /// PTRAC encoding (ascii or binary)
    #[arg(long, default_value = "ascii", value_name = "FORMAT")]
    ptrac_format: PtracFormat,

    /// JSON run summary output path
    #[arg(long, value_name = "PATH")]
    report: Option<PathBuf>,

    /// Increase log verbosity (-v info, -vv debug)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub(super) verbose: u8,
}

impl CompareArgs {
    fn oracle_config(&self) -> OracleConfig {
        OracleConfig {
            delta: self.delta,
            max_points: self.npts.unwrap_or(u64::MAX),
            guess_material_assocs: self.guess_material_assocs,
            ptrac_format: self.ptrac_format,
        }
    }
}

pub(super) fn run_compare_command(args: CompareArgs) -> Result<i32, CliError> {
    let started = Instant::now();
    let config = args.oracle_config();
    config.validate()?;

    let mcnp = parse_mcnp_file(&args.mcnp_input)?;
    let geometry = BoxGeometry::load(&args.geometry).map_err(oracle_core::OracleError::from)?;
    let mut reader = open_ptrac(&args.ptrac, config.ptrac_format)?;

    let budget = config.point_budget(mcnp.nps());
    let mut oracle = EquivalenceOracle::new(&geometry, &config);
    let mut statistics = Statistics::new(geometry.volume_count());
    tracing::info!(
        cells = mcnp.cell_count(),
        volumes = geometry.volume_count(),
        associations = oracle.associations().len(),
        budget,
        "starting comparison"
    );

    let processed = run_comparison(
        reader.as_mut(),
        &mcnp,
        &mut oracle,
        &mut statistics,
        budget,
    )?;
    let elapsed = started.elapsed();

    print!("{}", statistics.render_report());
    println!("{}", render_timing(elapsed, processed));

    let failed_points = failed_points_path(&args.geometry);
    statistics.write_failed_points(&failed_points)?;
    println!("Failed points: {}", failed_points.display());

    if let Some(report_path) = &args.report {
        let summary = RunSummary {
            points: processed,
            success: statistics.count(Outcome::Success),
            failure: statistics.count(Outcome::Failure),
            ignored: statistics.count(Outcome::Ignored),
            outside: statistics.count(Outcome::Outside),
            covered_volumes: statistics.covered_ranks().len(),
            declared_volumes: statistics.declared_volumes(),
            elapsed_seconds: elapsed.as_secs_f64(),
            failed_points_path: failed_points.display().to_string(),
        };
        write_run_summary(report_path, &summary)
            .with_context(|| format!("failed to write run summary '{}'", report_path.display()))?;
        println!("JSON report: {}", report_path.display());
    }

    Ok(0)
}
