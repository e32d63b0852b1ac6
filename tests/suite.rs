//! End-to-end suite runs against a stub simulator.

#![cfg(unix)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use pretty_assertions::assert_eq;
use tempfile::TempDir;

use xmile_regress::config::SuiteConfig;
use xmile_regress::reporter::Reporter;
use xmile_regress::runner::{discover_cases, run_suite};
use xmile_regress::types::{Summary, TestResult};

fn write_file(path: &Path, content: &str) {
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, content).unwrap();
}

/// Stand-in model: run by `/bin/sh`, it prints `sim.tsv` from its own
/// directory, or fails when the directory holds a `crash` marker.
const STUB_MODEL: &str = "\
d=$(dirname \"$0\")
if [ -e \"$d/crash\" ]; then echo 'parse error' >&2; exit 3; fi
cat \"$d/sim.tsv\"
";

fn write_case(base: &Path, name: &str, reference: &str, simulated: &str) {
    write_file(&base.join(name).join("model.stmx"), STUB_MODEL);
    write_file(&base.join(name).join("data.csv"), reference);
    write_file(&base.join(name).join("sim.tsv"), simulated);
}

fn suite(tmp: &TempDir) -> SuiteConfig {
    SuiteConfig {
        base_dir: tmp.path().join("compat"),
        simulator: PathBuf::from("/bin/sh"),
        ..SuiteConfig::default()
    }
}

#[test]
fn suite_reports_pass_fail_and_error() {
    let tmp = TempDir::new().unwrap();
    let config = suite(&tmp);
    let base = &config.base_dir;

    write_case(
        base,
        "a_teacup",
        "time,Teacup Temperature,Room Temperature\n0,180,70\n0.125,178.625,70\n",
        "time\tTeacup_Temperature\tRoom_Temperature\n0\t180\t70\n0.125\t178.6250001\t70.0\n",
    );
    write_case(
        base,
        "b_sir",
        "time,Infected\n0,1\n1,1.5\n2,2.25\n",
        "time\tInfected\n0\t1\n1\t1.6\n2\t9\n",
    );
    write_case(base, "c_broken", "time,x\n0,1\n", "");
    write_file(&base.join("c_broken/crash"), "");
    write_case(base, "d_short", "time,x,y\n0,1\n", "time\tx\ty\n0\t1\t2\n");

    let cases = discover_cases(&config).unwrap();
    assert_eq!(cases.len(), 4);

    let results = run_suite(&cases, &config, None, &mut Reporter::silent());

    assert!(results[0].is_pass(), "{results:?}");

    match &results[1] {
        TestResult::Fail { name, reason } => {
            assert_eq!(name, "b_sir");
            assert_eq!(reason, "time 1 mismatch in Infected (1.5 != 1.6)");
        }
        other => panic!("expected fail, got {other:?}"),
    }

    match &results[2] {
        TestResult::Error { error, .. } => assert!(error.contains("parse error"), "{error}"),
        other => panic!("expected error, got {other:?}"),
    }

    match &results[3] {
        TestResult::Error { error, .. } => {
            assert!(error.contains("expected 3 fields, found 2"), "{error}");
        }
        other => panic!("expected error, got {other:?}"),
    }

    let summary = Summary::from_results(&results);
    assert_eq!(summary.passed, 1);
    assert_eq!(summary.failed, 1);
    assert_eq!(summary.errored, 2);
    assert!(!summary.success());
}

#[test]
fn missing_simulated_series_fails_case() {
    let tmp = TempDir::new().unwrap();
    let config = suite(&tmp);
    write_case(
        &config.base_dir,
        "stocks",
        "time,Stock A,Stock B\n0,1,2\n1,1,2\n",
        "time\tStock_A\n0\t1\n1\t1\n",
    );

    let cases = discover_cases(&config).unwrap();
    let results = run_suite(&cases, &config, None, &mut Reporter::silent());

    match &results[0] {
        TestResult::Fail { reason, .. } => {
            assert_eq!(reason, "time 0 missing series Stock B in simulated output");
        }
        other => panic!("expected fail, got {other:?}"),
    }
}

#[test]
fn cli_compare_exit_status() {
    let tmp = TempDir::new().unwrap();
    let reference = tmp.path().join("data.csv");
    let good = tmp.path().join("good.tsv");
    let bad = tmp.path().join("bad.tsv");
    write_file(&reference, "time,level\n0,3.14159\n1,5\n");
    write_file(&good, "time\tlevel\n0\t3.14\n1\t5.0\n");
    write_file(&bad, "time\tlevel\n0\t3.14\n1\t5.0001\n");

    let bin = env!("CARGO_BIN_EXE_xmile-regress");

    let ok = Command::new(bin)
        .arg("compare")
        .arg(&reference)
        .arg(&good)
        .output()
        .unwrap();
    assert!(ok.status.success(), "{}", String::from_utf8_lossy(&ok.stderr));

    let fail = Command::new(bin)
        .arg("compare")
        .arg(&reference)
        .arg(&bad)
        .env("NO_COLOR", "1")
        .output()
        .unwrap();
    assert!(!fail.status.success());
    let stderr = String::from_utf8_lossy(&fail.stderr);
    assert!(
        stderr.contains("time 1 mismatch in level (5 != 5.0001)"),
        "{stderr}"
    );
}

#[test]
fn cli_quiet_suppresses_diagnostics() {
    let tmp = TempDir::new().unwrap();
    let reference = tmp.path().join("data.csv");
    let bad = tmp.path().join("bad.tsv");
    write_file(&reference, "time,level\n0,1\n");
    write_file(&bad, "time\tlevel\n0\t2\n");

    let out = Command::new(env!("CARGO_BIN_EXE_xmile-regress"))
        .args(["--quiet", "compare"])
        .arg(&reference)
        .arg(&bad)
        .output()
        .unwrap();
    assert!(!out.status.success());
    assert!(!String::from_utf8_lossy(&out.stderr).contains("mismatch"));
}

#[test]
fn cli_bundle_writes_module() {
    let tmp = TempDir::new().unwrap();
    let pre = tmp.path().join("runtime.js");
    let epi = tmp.path().join("epilogue.js");
    let css = tmp.path().join("draw.css");
    let out = tmp.path().join("runtime_src.ts");
    write_file(&pre, "var a = 1;\n");
    write_file(&epi, "done();\n");
    write_file(&css, "svg {}\n");

    let status = Command::new(env!("CARGO_BIN_EXE_xmile-regress"))
        .arg("bundle")
        .args([&pre, &epi, &css])
        .arg("-o")
        .arg(&out)
        .status()
        .unwrap();
    assert!(status.success());

    let module = fs::read_to_string(&out).unwrap();
    assert!(module.contains("export const preamble = \"var a = 1;\";"));
    assert!(module.contains("export const epilogue = \"done();\";"));
    assert!(module.contains("export const drawCSS = \"<defs><style>"));
}
