use oracle_core::geometry::{BoxGeometry, VolumeEngine};
use oracle_core::mcnp::parse_mcnp_file;
use oracle_core::oracle::EquivalenceOracle;
use oracle_core::ptrac::{PtracReader, open_ptrac};
use oracle_core::statistics::{Statistics, failed_points_path};
use oracle_core::{OracleConfig, OracleErrorCategory, Outcome, PtracFormat, run_comparison};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

const ASCII_HEADER: &str = "   -1
 mcp6   6.2     12/05/18 10:25:21
 slab verification problem
   1.4000E+01   1.0000E+00   1.0000E+00   0.0000E+00   0.0000E+00
   1.0000E+00   1.0000E+00   0.0000E+00   0.0000E+00   1.0000E+00
    2    6    3    0    0    0    0    0    0    0    0    0    0    0    0    0    0    0    0    0
    1    7    8    9   10   11   17   18   20   21   22
    0
";

fn fixture(name: &str) -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("fixtures")
        .join(name)
}

fn write_trace(dir: &Path, histories: &[(u64, u32, u32, [f64; 3])]) -> PathBuf {
    let mut trace = ASCII_HEADER.to_string();
    for (point, cell, material, [x, y, z]) in histories {
        trace.push_str(&format!("{:>9}  1000\n", point));
        trace.push_str(&format!("     2     1     1     0 {:>5} {:>5}\n", cell, material));
        trace.push_str(&format!(" {:E} {:E} {:E}\n", x, y, z));
    }
    let path = dir.join("slab.ptrac");
    fs::write(&path, trace).expect("trace should be written");
    path
}

/// One point per outcome, plus extra successes.
fn mixed_histories() -> Vec<(u64, u32, u32, [f64; 3])> {
    vec![
        (1, 3001, 1, [12.024, -72.882, 1.0883]),
        (2, 1001, 3, [0.0, 0.0, 0.0]),
        (3, 1001, 3, [-2.258, 18.880, -1.2856]),
        (4, 2001, 2, [50.0, 0.0, 0.0]),
        (5, 3001, 1, [10.0, 0.0, 0.0]),
        (6, 9999, 0, [500.0, 0.0, 0.0]),
    ]
}

#[test]
fn fixture_deck_resolves_cells_and_nps() {
    let mcnp = parse_mcnp_file(&fixture("slab.inp")).expect("fixture deck should parse");

    assert_eq!(mcnp.cell_count(), 6);
    assert_eq!(mcnp.nps(), Some(1000));
    assert_eq!(mcnp.density_signature(1001).unwrap(), "3_-1.0");
    assert_eq!(mcnp.density_signature(2001).unwrap(), "2_-7.87");
    assert_eq!(mcnp.density_signature(3001).unwrap(), "1_-2.7");
    assert_eq!(mcnp.density_signature(3002).unwrap(), "1_-2.699");
    assert_eq!(mcnp.density_signature(9999).unwrap(), "0_void");
}

#[test]
fn seeded_run_classifies_every_point_once() {
    let temp = TempDir::new().expect("tempdir should be created");
    let trace = write_trace(temp.path(), &mixed_histories());
    let mcnp = parse_mcnp_file(&fixture("slab.inp")).expect("fixture deck should parse");
    let geometry =
        BoxGeometry::load(&fixture("slab.geometry.json")).expect("fixture geometry should load");
    let config = OracleConfig::default();

    let mut reader = open_ptrac(&trace, PtracFormat::Ascii).expect("trace should open");
    let mut oracle = EquivalenceOracle::new(&geometry, &config);
    let mut statistics = Statistics::new(geometry.volume_count());
    let budget = config.point_budget(mcnp.nps());

    let processed = run_comparison(
        reader.as_mut(),
        &mcnp,
        &mut oracle,
        &mut statistics,
        budget,
    )
    .expect("comparison should complete");

    assert_eq!(processed, 6);
    assert_eq!(reader.points_read(), 6);
    assert_eq!(statistics.total(), processed);
    assert_eq!(statistics.count(Outcome::Success), 3);
    assert_eq!(statistics.count(Outcome::Failure), 1);
    assert_eq!(statistics.count(Outcome::Ignored), 1);
    assert_eq!(statistics.count(Outcome::Outside), 1);
    assert_eq!(statistics.covered_ranks().len(), 2);

    let failure = &statistics.failed_points()[0];
    assert_eq!(failure.mcnp_point_id, 4);
    assert_eq!(failure.mcnp_cell_id, 2001);
    assert_eq!(failure.rank, 1);
    assert_eq!(failure.color, 40.0);

    let report = statistics.render_report();
    assert!(report.contains("Points processed: 6"));
    assert!(report.contains("Volumes covered: 2 / 3"));
}

#[test]
fn failed_points_land_next_to_the_geometry() {
    let temp = TempDir::new().expect("tempdir should be created");
    let trace = write_trace(temp.path(), &mixed_histories());
    let geometry_path = temp.path().join("slab.t4");
    fs::copy(fixture("slab.geometry.json"), &geometry_path).expect("geometry copied");

    let mcnp = parse_mcnp_file(&fixture("slab.inp")).expect("fixture deck should parse");
    let geometry = BoxGeometry::load(&geometry_path).expect("geometry should load");
    let mut reader = open_ptrac(&trace, PtracFormat::Ascii).expect("trace should open");
    let mut oracle = EquivalenceOracle::new(&geometry, &OracleConfig::default());
    let mut statistics = Statistics::new(geometry.volume_count());
    run_comparison(reader.as_mut(), &mcnp, &mut oracle, &mut statistics, u64::MAX)
        .expect("comparison should complete");

    let output = failed_points_path(&geometry_path);
    statistics
        .write_failed_points(&output)
        .expect("failed points should be written");

    assert_eq!(output, temp.path().join("slab.failedpoints.json"));
    let json: serde_json::Value =
        serde_json::from_str(&fs::read_to_string(&output).expect("output readable"))
            .expect("output is JSON");
    assert_eq!(json.as_array().map(Vec::len), Some(1));
    assert_eq!(json[0]["mcnpCellId"], 2001);
}

#[test]
fn guessing_mode_learns_unseeded_signatures() {
    let temp = TempDir::new().expect("tempdir should be created");
    let trace = write_trace(
        temp.path(),
        &[
            (1, 3002, 1, [50.0, 50.0, 50.0]),
            (2, 3002, 1, [-50.0, -50.0, 50.0]),
            (3, 3002, 1, [0.0, 0.0, 0.0]),
        ],
    );
    let mcnp = parse_mcnp_file(&fixture("slab.inp")).expect("fixture deck should parse");
    let geometry =
        BoxGeometry::load(&fixture("slab.geometry.json")).expect("fixture geometry should load");
    let config = OracleConfig {
        guess_material_assocs: true,
        ..OracleConfig::default()
    };

    let mut reader = open_ptrac(&trace, config.ptrac_format).expect("trace should open");
    let mut oracle = EquivalenceOracle::new(&geometry, &config);
    let mut statistics = Statistics::new(geometry.volume_count());
    run_comparison(reader.as_mut(), &mcnp, &mut oracle, &mut statistics, u64::MAX)
        .expect("comparison should complete");

    assert_eq!(oracle.associations().composition_for("1_-2.699"), Some("m1_-2.7"));
    assert_eq!(statistics.count(Outcome::Success), 2);
    assert_eq!(statistics.count(Outcome::Failure), 1);
}

#[test]
fn seeded_run_stops_on_an_unmapped_signature() {
    let temp = TempDir::new().expect("tempdir should be created");
    let trace = write_trace(temp.path(), &[(1, 3002, 1, [50.0, 50.0, 50.0])]);
    let mcnp = parse_mcnp_file(&fixture("slab.inp")).expect("fixture deck should parse");
    let geometry =
        BoxGeometry::load(&fixture("slab.geometry.json")).expect("fixture geometry should load");

    let mut reader = open_ptrac(&trace, PtracFormat::Ascii).expect("trace should open");
    let mut oracle = EquivalenceOracle::new(&geometry, &OracleConfig::default());
    let mut statistics = Statistics::new(geometry.volume_count());
    let error = run_comparison(reader.as_mut(), &mcnp, &mut oracle, &mut statistics, u64::MAX)
        .expect_err("unmapped signature should stop the run");

    assert_eq!(error.category(), OracleErrorCategory::ComputationError);
    assert_eq!(error.placeholder(), "RUN.UNMAPPED_SIGNATURE");
}
