//! End-to-end tests that run a stand-in optimizer script under the executor.

mod supervisor;

use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use std::time::Duration;

use fbexec::ExecutorSettings;

pub const INPUT: &str = "\
$options
jobtype optimize
forcefield water.itp
maxstep 5
$end

$target
name cluster
type ABINITIO_GMX
$end

$target
name liquid
type LIQUID_OPENMM
weight 2.0
$end
";

/// Shell snippet that writes the artifacts of iteration `$1` for both targets.
pub const WRITE_ITERATION: &str = r#"
write_iteration() {
    for t in cluster liquid; do
        d=fb.tmp/$t/$(printf 'iter_%04d' "$1")
        mkdir -p "$d"
        echo "{\"X\": 1.5, \"G\": [0.1, 0.2]}" > "$d/objective.p"
        echo "0.$1 1.0" > "$d/mvals.txt"
    done
}
"#;

/// Write an executable `/bin/sh` script standing in for the optimizer.
pub fn write_script(dir: &Path, body: &str) -> PathBuf {
    let path = dir.join("fake-forcebalance.sh");
    fs::write(&path, format!("#!/bin/sh\n{WRITE_ITERATION}\n{body}\n")).unwrap();
    fs::set_permissions(&path, fs::Permissions::from_mode(0o755)).unwrap();
    path
}

pub fn settings_for(program: &Path) -> ExecutorSettings {
    ExecutorSettings {
        program: program.to_string_lossy().into_owned(),
        interval: Duration::from_millis(20),
        ..Default::default()
    }
}
