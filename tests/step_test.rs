use rankstep::rankstep_core::{Diagnostic, MissingRankPolicy};
use rankstep::{accumulate_file, JobError, StepConfig, StepJob};
use std::fs;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

fn write(dir: &Path, name: &str, contents: &str) -> PathBuf {
    let path = dir.join(name);
    fs::write(&path, contents).unwrap();
    path
}

fn sorted_lines(path: &Path) -> Vec<String> {
    let mut lines: Vec<String> = fs::read_to_string(path)
        .unwrap()
        .lines()
        .map(str::to_string)
        .collect();
    lines.sort();
    lines
}

#[test]
fn test_step_end_to_end() {
    let dir = TempDir::new().unwrap();
    let transitions = write(dir.path(), "transition.txt", "A\tB,C\nB\tC\n");
    let ranks = write(dir.path(), "pr0.txt", "A\t1.0\nB\t1.0\n");
    let output = dir.path().join("contributions.txt");

    let job = StepJob::new(StepConfig::default()).unwrap();
    let report = job.run(&transitions, &ranks, &output).unwrap();

    assert_eq!(report.contributions, 3);
    assert_eq!(sorted_lines(&output), vec!["B\t0.4", "C\t0.4", "C\t0.8"]);

    // Downstream keyed summation
    let summed = dir.path().join("pr1.txt");
    assert_eq!(accumulate_file(&output, &summed).unwrap(), 2);
    let lines = sorted_lines(&summed);
    assert_eq!(lines[0], "B\t0.4");
    let c: f64 = lines[1].strip_prefix("C\t").unwrap().parse().unwrap();
    assert!((c - 1.2).abs() < 1e-12);
}

#[test]
fn test_malformed_rank_writes_no_output() {
    let dir = TempDir::new().unwrap();
    let transitions = write(dir.path(), "transition.txt", "A\tB\nB\tA\n");
    let ranks = write(dir.path(), "pr0.txt", "B\t1.0\nA\tNaNtext\n");
    let output = dir.path().join("contributions.txt");

    let job = StepJob::new(StepConfig::default()).unwrap();
    let err = job.run(&transitions, &ranks, &output).unwrap_err();

    match &err {
        JobError::Malformed { line_number, source, .. } => {
            assert_eq!(*line_number, 2);
            assert!(source.to_string().contains("A\\tNaNtext"));
        }
        other => panic!("unexpected error: {}", other),
    }
    assert!(err.to_string().contains("pr0.txt:2"));
    assert!(!output.exists());
    // No temporary files left behind either
    assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 2);
}

#[test]
fn test_failed_step_keeps_previous_output() {
    let dir = TempDir::new().unwrap();
    let transitions = write(dir.path(), "transition.txt", "A\tB\n");
    let ranks = write(dir.path(), "pr0.txt", "A\tbroken\n");
    let output = write(dir.path(), "contributions.txt", "B\t0.8\n");

    let job = StepJob::new(StepConfig::default()).unwrap();
    assert!(job.run(&transitions, &ranks, &output).is_err());
    assert_eq!(fs::read_to_string(&output).unwrap(), "B\t0.8\n");
}

#[test]
fn test_dangling_and_missing_rank_diagnostics() {
    let dir = TempDir::new().unwrap();
    let transitions = write(dir.path(), "transition.txt", "A\tB\nP1\t\nC\tA\n");
    let ranks = write(dir.path(), "pr0.txt", "A\t1.0\nP1\t1.0\n");

    let job = StepJob::new(StepConfig::default()).unwrap();
    let result = job.compute(&transitions, &ranks).unwrap();

    assert_eq!(result.report.dangling_pages, 1);
    assert_eq!(result.report.missing_ranks, 1);
    assert!(result.diagnostics.contains(&Diagnostic::DanglingPage {
        page: "P1".to_string(),
        line: "P1\t".to_string(),
    }));
    assert!(result
        .diagnostics
        .contains(&Diagnostic::MissingRank { page: "C".to_string() }));

    let from_c: Vec<f64> = result
        .outputs
        .iter()
        .filter(|o| o.source == "C")
        .flat_map(|o| o.contributions.iter().map(|c| c.amount))
        .collect();
    assert_eq!(from_c, vec![0.0]);
}

#[test]
fn test_missing_rank_strict_policy_fails_step() {
    let dir = TempDir::new().unwrap();
    let transitions = write(dir.path(), "transition.txt", "A\tB\nC\tA\n");
    let ranks = write(dir.path(), "pr0.txt", "A\t1.0\n");
    let output = dir.path().join("contributions.txt");

    let config = StepConfig {
        missing_rank: MissingRankPolicy::Error,
        ..StepConfig::default()
    };
    let err = StepJob::new(config).unwrap().run(&transitions, &ranks, &output).unwrap_err();
    assert!(err.to_string().contains("No prior rank for source page C"));
    assert!(!output.exists());
}

#[test]
fn test_config_file_damping() {
    let dir = TempDir::new().unwrap();
    let config_path = write(dir.path(), "rankstep.yaml", "damping_factor: 0.5\nthreads: 2\n");
    let transitions = write(dir.path(), "transition.txt", "A\tB\n");
    let ranks = write(dir.path(), "pr0.txt", "A\t2.0\n");

    let job = StepJob::new(StepConfig::from_file(&config_path).unwrap()).unwrap();
    let result = job.compute(&transitions, &ranks).unwrap();

    let amounts: Vec<f64> = result.contributions().map(|c| c.amount).collect();
    assert_eq!(amounts, vec![1.0]);
}

#[test]
fn test_cancelled_step_writes_nothing() {
    let dir = TempDir::new().unwrap();
    let transitions = write(dir.path(), "transition.txt", "A\tB\n");
    let ranks = write(dir.path(), "pr0.txt", "A\t1.0\n");
    let output = dir.path().join("contributions.txt");

    let job = StepJob::new(StepConfig::default()).unwrap();
    job.cancellation().cancel();

    let err = job.run(&transitions, &ranks, &output).unwrap_err();
    assert!(err.is_cancelled());
    assert!(!output.exists());
}

#[test]
fn test_missing_input_file() {
    let dir = TempDir::new().unwrap();
    let ranks = write(dir.path(), "pr0.txt", "A\t1.0\n");
    let job = StepJob::new(StepConfig::default()).unwrap();

    let err = job
        .compute(&dir.path().join("missing.txt"), &ranks)
        .unwrap_err();
    assert!(matches!(err, JobError::Io { .. }));
}
