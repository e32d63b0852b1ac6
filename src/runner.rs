//! Suite runner.
//!
//! Discovers model cases, runs the simulator on each, and compares its
//! output against the reference fixture.

use anyhow::{anyhow, Context, Result};
use std::fs::{self, File};
use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use tracing::{debug, trace};

use crate::compare::{compare, Comparison, MismatchLine};
use crate::config::{SuiteConfig, SIMULATOR_ENV};
use crate::reporter::Reporter;
use crate::series::SeriesTable;
use crate::types::{TestCase, TestResult};

/// Lists cases under `config.base_dir`, sorted by directory name.
///
/// A directory without a readable model file is not a case.
pub fn discover_cases(config: &SuiteConfig) -> Result<Vec<TestCase>> {
    let base = &config.base_dir;
    if !base.is_dir() {
        anyhow::bail!("Suite directory not found: {}", base.display());
    }

    let mut dirs = Vec::new();
    for entry in fs::read_dir(base).with_context(|| format!("Failed to list {}", base.display()))? {
        let path = entry?.path();
        if path.is_dir() {
            dirs.push(path);
        }
    }
    dirs.sort();

    let mut cases = Vec::new();
    for dir in dirs {
        let name = dir
            .file_name()
            .map(|n| n.to_string_lossy().into_owned())
            .unwrap_or_default();

        let Some(model) = find_model(&dir, &config.extensions) else {
            debug!(case = %name, "no model file, skipping");
            continue;
        };

        cases.push(TestCase {
            name,
            reference: dir.join(&config.reference_file),
            model,
        });
    }

    Ok(cases)
}

/// First `model.<ext>` in `dir` that can be opened.
fn find_model(dir: &Path, extensions: &[String]) -> Option<PathBuf> {
    extensions
        .iter()
        .map(|ext| dir.join(format!("model.{ext}")))
        .find(|path| File::open(path).is_ok())
}

/// Runs every case in order. Cases whose name does not contain `filter`
/// are skipped.
pub fn run_suite(
    cases: &[TestCase],
    config: &SuiteConfig,
    filter: Option<&str>,
    reporter: &mut Reporter,
) -> Vec<TestResult> {
    cases
        .iter()
        .map(|case| match filter {
            Some(f) if !case.name.contains(f) => TestResult::Skip {
                name: case.name.clone(),
                reason: format!("does not match filter '{f}'"),
            },
            _ => run_case(case, config, reporter),
        })
        .collect()
}

/// Simulates one case and compares the output with its reference.
pub fn run_case(case: &TestCase, config: &SuiteConfig, reporter: &mut Reporter) -> TestResult {
    reporter.debug(format_args!("testing {}", case.name));

    let simulated = match run_simulator(&config.simulator, &case.model, config.timeout()) {
        Ok(stdout) => stdout,
        Err(e) => {
            reporter.error(format_args!("simulator failed: {e:#}"));
            return TestResult::Error {
                name: case.name.clone(),
                error: format!("Simulator failed: {e:#}"),
            };
        }
    };

    let tables = load_tables(case, config, &simulated);
    let (reference, simulated) = match tables {
        Ok(t) => t,
        Err(e) => {
            reporter.error(format_args!("{}: {e:#}", case.name));
            return TestResult::Error {
                name: case.name.clone(),
                error: format!("{e:#}"),
            };
        }
    };

    match compare(&reference, &simulated, reporter) {
        Comparison::Match { steps } => TestResult::Pass {
            name: case.name.clone(),
            details: format!("{steps} time steps matched"),
        },
        Comparison::Mismatch {
            step, mismatches, ..
        } => {
            let first = mismatches.first().map_or_else(String::new, |m| {
                MismatchLine {
                    step: &step,
                    mismatch: m,
                }
                .to_string()
            });
            let reason = match mismatches.len() {
                0 | 1 => first,
                n => format!("{first} (+{} more at this step)", n - 1),
            };
            TestResult::Fail {
                name: case.name.clone(),
                reason,
            }
        }
    }
}

fn load_tables(
    case: &TestCase,
    config: &SuiteConfig,
    simulated: &str,
) -> Result<(SeriesTable, SeriesTable)> {
    let simulated = SeriesTable::parse(simulated, config.simulated_delimiter()?)
        .context("Malformed simulator output")?;

    let file = File::open(&case.reference)
        .with_context(|| format!("Failed to open {}", case.reference.display()))?;
    let reference = SeriesTable::load(file, config.reference_delimiter()?)
        .with_context(|| format!("Malformed reference {}", case.reference.display()))?;

    Ok((reference, simulated))
}

/// Runs `simulator <model>` and returns its stdout.
pub fn run_simulator(simulator: &Path, model: &Path, timeout: Duration) -> Result<String> {
    let mut command = Command::new(simulator);
    command.arg(model);

    let output = execute_with_timeout(&mut command, timeout).with_context(|| {
        format!(
            "Failed to execute: {} {}",
            simulator.display(),
            model.display()
        )
    })?;

    if !output.status.success() {
        return Err(anyhow!(
            "exit {}: {}",
            output.status.code().unwrap_or(-1),
            String::from_utf8_lossy(&output.stderr).trim()
        ));
    }

    String::from_utf8(output.stdout).context("Simulator output is not UTF-8")
}

#[allow(clippy::cast_possible_truncation)]
fn execute_with_timeout(command: &mut Command, timeout: Duration) -> Result<Output> {
    let mut child = command
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .context("Failed to spawn simulator process")?;

    // Read both pipes concurrently; a full pipe stalls the child.
    let stdout = child.stdout.take().map(drain);
    let stderr = child.stderr.take().map(drain);

    let timeout_ms = timeout.as_millis() as u64;
    let start = Instant::now();

    let status = loop {
        match child.try_wait() {
            Ok(Some(status)) => break status,
            Ok(None) => {
                if start.elapsed() > timeout {
                    let _ = child.kill();
                    let _ = child.wait();
                    return Err(anyhow!("Command timed out after {timeout_ms}ms"));
                }
                thread::sleep(Duration::from_millis(10));
            }
            Err(e) => return Err(anyhow!("Error waiting for process: {e}")),
        }
    };
    trace!(elapsed_ms = start.elapsed().as_millis() as u64, "simulator exited");

    let collect = |handle: Option<thread::JoinHandle<Vec<u8>>>| {
        handle.and_then(|h| h.join().ok()).unwrap_or_default()
    };

    Ok(Output {
        status,
        stdout: collect(stdout),
        stderr: collect(stderr),
    })
}

fn drain<R: Read + Send + 'static>(mut pipe: R) -> thread::JoinHandle<Vec<u8>> {
    thread::spawn(move || {
        let mut buf = Vec::new();
        let _ = pipe.read_to_end(&mut buf);
        buf
    })
}

/// Finds the simulator binary.
pub fn find_simulator() -> Option<PathBuf> {
    if let Some(path) = std::env::var_os(SIMULATOR_ENV) {
        let path = PathBuf::from(path);
        if path.exists() {
            return Some(path);
        }
    }

    let local = Path::new("./xmilerun");
    if local.exists() {
        return Some(local.to_path_buf());
    }

    if Command::new("xmilerun")
        .arg("--help")
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status()
        .is_ok()
    {
        return Some(PathBuf::from("xmilerun"));
    }

    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(path: &Path, content: &str) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_discover_first_readable_extension() {
        let tmp = TempDir::new().unwrap();
        write(&tmp.path().join("b_model/model.mdl"), "");
        write(&tmp.path().join("b_model/model.xmile"), "");
        write(&tmp.path().join("a_model/model.stmx"), "");
        write(&tmp.path().join("empty/notes.txt"), "");

        let config = SuiteConfig {
            base_dir: tmp.path().to_path_buf(),
            ..SuiteConfig::default()
        };
        let cases = discover_cases(&config).unwrap();

        let names: Vec<_> = cases.iter().map(|c| c.name.as_str()).collect();
        assert_eq!(names, ["a_model", "b_model"]);
        assert_eq!(cases[1].model, tmp.path().join("b_model/model.mdl"));
        assert_eq!(cases[1].reference, tmp.path().join("b_model/data.csv"));
    }

    #[test]
    fn test_discover_missing_base() {
        let config = SuiteConfig {
            base_dir: PathBuf::from("/nonexistent/suite"),
            ..SuiteConfig::default()
        };
        assert!(discover_cases(&config).is_err());
    }

    #[test]
    fn test_missing_simulator_is_error() {
        let case = TestCase {
            name: "m".to_string(),
            model: PathBuf::from("model.stmx"),
            reference: PathBuf::from("data.csv"),
        };
        let config = SuiteConfig {
            simulator: PathBuf::from("/nonexistent/xmilerun"),
            ..SuiteConfig::default()
        };
        let result = run_case(&case, &config, &mut Reporter::silent());
        assert!(result.is_error());
    }

    #[test]
    fn test_filter_skips() {
        let case = TestCase {
            name: "teacup".to_string(),
            model: PathBuf::from("model.stmx"),
            reference: PathBuf::from("data.csv"),
        };
        let results = run_suite(
            &[case],
            &SuiteConfig::default(),
            Some("sir"),
            &mut Reporter::silent(),
        );
        assert!(results[0].is_skip());
    }
}
