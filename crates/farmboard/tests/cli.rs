#![allow(clippy::unwrap_used, clippy::expect_used, missing_docs)]

use std::path::Path;
use std::process::{Command, Output};

use anyhow::{Result, anyhow};
use assert_cmd::cargo::CommandCargoExt;
use serde_json::Value;
use tempfile::TempDir;

struct Board {
    dir: TempDir,
}

impl Board {
    fn new() -> Result<Self> {
        Ok(Self {
            dir: tempfile::tempdir()?,
        })
    }

    fn store(&self) -> std::path::PathBuf {
        self.dir.path().join("tasks.json")
    }

    fn workdir(&self) -> &Path {
        self.dir.path()
    }

    fn run(&self, args: &[&str]) -> Result<Output> {
        let output = Command::cargo_bin("farmboard")?
            .arg("--store")
            .arg(self.store())
            .arg("--workdir")
            .arg(self.workdir())
            .args(["--today", "2024-03-10"])
            .args(args)
            .env("RUST_LOG", "warn")
            .output()?;
        Ok(output)
    }

    fn ok(&self, args: &[&str]) -> Result<String> {
        let output = self.run(args)?;
        if !output.status.success() {
            return Err(anyhow!(
                "farmboard {args:?} failed: {}",
                String::from_utf8_lossy(&output.stderr)
            ));
        }
        Ok(String::from_utf8(output.stdout)?)
    }

    fn tasks(&self, args: &[&str]) -> Result<Vec<Value>> {
        let mut full = vec!["ls", "--format", "json"];
        full.extend_from_slice(args);
        let parsed: Value = serde_json::from_str(&self.ok(&full)?)?;
        parsed
            .as_array()
            .cloned()
            .ok_or_else(|| anyhow!("ls did not print an array"))
    }
}

#[test]
fn weekly_task_expands_into_instances() -> Result<()> {
    let board = Board::new()?;
    let out = board.ok(&[
        "new",
        "--title",
        "Water field",
        "--due",
        "2024-03-01",
        "--repeat",
        "weekly",
        "--until",
        "2024-03-22",
    ])?;
    assert!(out.contains("4 recurring tasks created!"), "unexpected output: {out}");

    let tasks = board.tasks(&[])?;
    let titles: Vec<&str> = tasks.iter().filter_map(|task| task["title"].as_str()).collect();
    assert_eq!(
        titles,
        vec![
            "Water field (Week 1)",
            "Water field (Week 2)",
            "Water field (Week 3)",
            "Water field (Week 4)"
        ]
    );
    Ok(())
}

#[test]
fn filters_and_sorting_shape_the_listing() -> Result<()> {
    let board = Board::new()?;
    board.ok(&["new", "--title", "Spray", "--due", "2024-03-05", "--priority", "high"])?;
    board.ok(&["new", "--title", "Weed", "--due", "2024-03-20", "--priority", "high"])?;
    board.ok(&["new", "--title", "Harvest", "--due", "2024-03-01", "--priority", "low"])?;

    let overdue_high = board.tasks(&["--priority", "high", "--due", "overdue"])?;
    assert_eq!(overdue_high.len(), 1);
    assert_eq!(overdue_high[0]["title"], "Spray");

    let by_name = board.tasks(&["--sort", "name", "--order", "desc"])?;
    let titles: Vec<&str> = by_name.iter().filter_map(|task| task["title"].as_str()).collect();
    assert_eq!(titles, vec!["Weed", "Spray", "Harvest"]);
    Ok(())
}

#[test]
fn move_toggle_and_delete_round_trip() -> Result<()> {
    let board = Board::new()?;
    board.ok(&["new", "--title", "Spray", "--due", "2024-03-12"])?;
    let id = board.tasks(&[])?[0]["id"]
        .as_str()
        .map(str::to_owned)
        .ok_or_else(|| anyhow!("missing id"))?;

    let moved = board.ok(&["move", id.as_str(), "--to", "done"])?;
    assert!(moved.contains("Task moved to Done"));
    let done = board.tasks(&[])?;
    assert_eq!(done[0]["completed"], true);
    assert_eq!(done[0]["completionDate"], "2024-03-10");

    let toggled = board.ok(&["toggle", id.as_str()])?;
    assert!(toggled.contains("is now To Do"));

    let same = board.ok(&["move", id.as_str(), "--to", "todo"])?;
    assert!(same.contains("already in that column"));

    board.ok(&["rm", id.as_str()])?;
    assert!(board.tasks(&[])?.is_empty());
    Ok(())
}

#[test]
fn invalid_input_is_rejected_before_saving() -> Result<()> {
    let board = Board::new()?;
    let blank = board.run(&["new", "--title", "   ", "--due", "2024-03-12"])?;
    assert!(!blank.status.success());
    assert!(String::from_utf8_lossy(&blank.stderr).contains("Task title must not be empty"));

    let stranger = board.run(&["new", "--title", "Spray", "--due", "2024-03-12", "--assignee", "Nobody"])?;
    assert!(!stranger.status.success());

    assert!(board.tasks(&[])?.is_empty());
    Ok(())
}

#[test]
fn expense_report_ignores_malformed_bounds() -> Result<()> {
    let board = Board::new()?;
    board.ok(&["expense", "add", "--amount", "40", "--category", "Fuel", "--description", "diesel"])?;
    board.ok(&["expense", "add", "--amount", "100", "--category", "Seeds", "--description", "kale seed"])?;

    let report: Value = serde_json::from_str(&board.ok(&[
        "expense", "report", "--min", "abc", "--max", "50", "--format", "json",
    ])?)?;
    let expenses = report["expenses"]
        .as_array()
        .ok_or_else(|| anyhow!("missing expenses"))?;
    assert_eq!(expenses.len(), 1);
    assert_eq!(expenses[0]["category"], "Fuel");
    assert_eq!(report["summary"]["count"], 1);
    Ok(())
}
