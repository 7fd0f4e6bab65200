//! End-to-end tests for the merkle-stream binary

use anyhow::Result;
use assert_cmd::Command;
use merkle_stream::{sha256, InMemoryTreeEngine};
use predicates::prelude::*;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// Temporary workspace with a line-per-leaf input file
struct Workspace {
    temp_dir: TempDir,
    input: PathBuf,
    config: PathBuf,
}

impl Workspace {
    fn new(lines: &[&str]) -> Result<Self> {
        let temp_dir = TempDir::new()?;
        let input = temp_dir.path().join("leaves.txt");
        std::fs::write(&input, lines.join("\n"))?;
        // Never created, so every run uses the default config
        let config = temp_dir.path().join("config.toml");
        Ok(Self {
            temp_dir,
            input,
            config,
        })
    }

    fn path(&self, name: &str) -> PathBuf {
        self.temp_dir.path().join(name)
    }

    fn command(&self) -> Result<Command> {
        let mut cmd = Command::cargo_bin("merkle-stream")?;
        cmd.arg("--config").arg(&self.config);
        Ok(cmd)
    }
}

fn json_output(cmd: &mut Command) -> Result<serde_json::Value> {
    let output = cmd.assert().success().get_output().stdout.clone();
    Ok(serde_json::from_slice(&output)?)
}

fn expected_root(lines: &[&str]) -> Result<String> {
    Ok(InMemoryTreeEngine::new(sha256())
        .build(lines)?
        .root()
        .to_hex())
}

fn arg(path: &Path) -> &str {
    path.to_str().expect("temp paths are UTF-8")
}

const LEAVES: &[&str] = &["alpha", "bravo", "charlie", "delta", "echo"];

#[test]
fn test_build_json_matches_library() -> Result<()> {
    let ws = Workspace::new(LEAVES)?;
    let value = json_output(ws.command()?.args(["build", "--input", arg(&ws.input), "--json"]))?;

    assert_eq!(value["root"], expected_root(LEAVES)?);
    assert_eq!(value["height"], 3);
    assert_eq!(value["leaf_count"], 5);
    assert_eq!(value["algorithm"], "SHA-256");

    let in_memory = json_output(ws.command()?.args([
        "build",
        "--input",
        arg(&ws.input),
        "--in-memory",
        "--json",
    ]))?;
    assert_eq!(in_memory["root"], value["root"]);
    Ok(())
}

#[test]
fn test_build_human_output() -> Result<()> {
    let ws = Workspace::new(LEAVES)?;
    ws.command()?
        .args(["build", "--input", arg(&ws.input)])
        .assert()
        .success()
        .stdout(predicate::str::contains(expected_root(LEAVES)?));
    Ok(())
}

#[test]
fn test_prove_and_verify_with_cache() -> Result<()> {
    let ws = Workspace::new(LEAVES)?;
    let cache = ws.path("leaves.mktc");
    let proof = ws.path("leaf-3.proof");
    let root = expected_root(LEAVES)?;

    let built = json_output(ws.command()?.args([
        "build",
        "--input",
        arg(&ws.input),
        "--cache",
        arg(&cache),
        "--cache-levels",
        "2",
        "--json",
    ]))?;
    assert_eq!(built["cache"], arg(&cache));

    ws.command()?
        .args([
            "prove",
            "--input",
            arg(&ws.input),
            "--index",
            "3",
            "--cache",
            arg(&cache),
            "--output",
            arg(&proof),
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Proof generated"));

    let verified = json_output(ws.command()?.args([
        "verify",
        "--proof",
        arg(&proof),
        "--root",
        root.as_str(),
        "--json",
    ]))?;
    assert_eq!(verified["valid"], true);
    assert_eq!(verified["leaf_index"], 3);
    assert_eq!(verified["leaf_value"], hex::encode("delta"));
    Ok(())
}

#[test]
fn test_verify_wrong_root_fails() -> Result<()> {
    let ws = Workspace::new(LEAVES)?;
    let proof = ws.path("leaf-0.proof");

    ws.command()?
        .args(["prove", "--input", arg(&ws.input), "--index", "0", "--output", arg(&proof)])
        .assert()
        .success();

    let wrong_root = "00".repeat(32);
    ws.command()?
        .args(["verify", "--proof", arg(&proof), "--root", wrong_root.as_str()])
        .assert()
        .failure()
        .stdout(predicate::str::contains("verification failed"));
    Ok(())
}

#[test]
fn test_inspect_cache() -> Result<()> {
    let ws = Workspace::new(LEAVES)?;
    let cache = ws.path("leaves.mktc");
    ws.command()?
        .args([
            "build",
            "--input",
            arg(&ws.input),
            "--cache",
            arg(&cache),
            "--cache-levels",
            "2",
        ])
        .assert()
        .success();

    let value = json_output(ws.command()?.args(["inspect-cache", "--cache", arg(&cache), "--json"]))?;
    assert_eq!(value["tree_height"], 3);
    assert_eq!(value["start_level"], 1);
    assert_eq!(value["end_level"], 2);
    assert_eq!(value["levels"][0]["nodes"], 3);
    assert_eq!(value["levels"][1]["nodes"], 2);
    Ok(())
}

#[test]
fn test_error_paths() -> Result<()> {
    let ws = Workspace::new(LEAVES)?;

    ws.command()?
        .args(["build", "--input", arg(&ws.path("missing.txt"))])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Input file not found"));

    ws.command()?
        .args([
            "prove",
            "--input",
            arg(&ws.input),
            "--index",
            "5",
            "--output",
            arg(&ws.path("out.proof")),
        ])
        .assert()
        .failure()
        .stderr(predicate::str::contains("out of range"));

    ws.command()?
        .args(["--algorithm", "md5", "build", "--input", arg(&ws.input)])
        .assert()
        .failure();
    Ok(())
}
