//! Integration tests for the fbexec library: config round trips, history loading and status
//! inference against real project folders.

mod config_roundtrip;
mod status_inference;

use std::fs;
use std::path::Path;

use fbexec::history::artifacts::{OBJECTIVE_FILE, PARAMETERS_FILE};

/// Input file with two targets, the second with a higher weight.
pub const TWO_TARGET_INPUT: &str = "\
$options
jobtype optimize
forcefield water.itp
maxstep 5
$end

$target
name cluster
type AbInitio_GMX
$end

$target
name liquid
type Liquid_OpenMM
weight 2.0
$end
";

/// Write the artifacts of one (target, iteration) pair under `<root>/fb.tmp`.
pub fn write_iteration(root: &Path, target: &str, iteration: usize, value: f64, mvals: &[f64]) {
    let dir = root
        .join("fb.tmp")
        .join(target)
        .join(format!("iter_{iteration:04}"));
    fs::create_dir_all(&dir).unwrap();
    fs::write(
        dir.join(OBJECTIVE_FILE),
        format!(r#"{{"X": {value}, "G": [0.25, -0.5]}}"#),
    )
    .unwrap();
    let mvals: Vec<String> = mvals.iter().map(|v| v.to_string()).collect();
    fs::write(dir.join(PARAMETERS_FILE), mvals.join(" ")).unwrap();
}
