use std::process::{Command, Output};

fn mini_stencil(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_mini_stencil"))
        .args(args)
        .env("RUST_LOG", "error")
        .output()
        .expect("failed to launch mini_stencil")
}

#[test]
fn test_converged_run_exits_zero() {
    let out = mini_stencil(&["16", "16", "5", "0.0025"]);
    assert_eq!(out.status.code(), Some(0));

    let stdout = String::from_utf8_lossy(&out.stdout);
    assert!(stdout.contains("Welcome to mini-stencil!"));
    assert!(stdout.contains("iteration :: CG 200, Newton 50"));
    assert!(stdout.contains("conjugate gradient iterations"));
    assert!(stdout.contains("Goodbye!"));
}

#[test]
fn test_invalid_arguments_exit_one() {
    // unparsable number
    assert_eq!(mini_stencil(&["sixteen", "16", "5", "0.0025"]).status.code(), Some(1));
    // missing positional
    assert_eq!(mini_stencil(&["16", "16", "5"]).status.code(), Some(1));
    // parses, but the grid is too small
    assert_eq!(mini_stencil(&["1", "16", "5", "0.0025"]).status.code(), Some(1));
    // negative simulated time
    assert_eq!(mini_stencil(&["16", "16", "5", "--", "-1.0"]).status.code(), Some(1));
}

#[test]
fn test_non_convergence_exits_two() {
    let out = mini_stencil(&["16", "16", "5", "0.0025", "--max-cg", "1"]);
    assert_eq!(out.status.code(), Some(2));

    let stderr = String::from_utf8_lossy(&out.stderr);
    assert!(stderr.contains("CG failed to converge after 1 iterations"));
    assert!(stderr.contains("step 1 ERROR : nonlinear iterations failed to converge"));
}

#[test]
fn test_output_writes_field() {
    let path = std::env::temp_dir().join("kernbench_mini_stencil_field.json");
    let out = mini_stencil(&["12", "8", "2", "0.001", "--output", path.to_str().unwrap()]);
    assert_eq!(out.status.code(), Some(0));

    let text = std::fs::read_to_string(&path).unwrap();
    let dump: serde_json::Value = serde_json::from_str(&text).unwrap();
    assert_eq!(dump["nx"], 12);
    assert_eq!(dump["ny"], 8);
    assert_eq!(dump["field"].as_array().unwrap().len(), 96);
    assert_eq!(dump["status"]["converged"], true);
    std::fs::remove_file(&path).ok();
}
