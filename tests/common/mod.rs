#![allow(dead_code)]

pub mod gated;
pub mod mock_data;

use std::fs;
use std::process::{Command, Output};
use tempfile::TempDir;

/// Helper struct to run sprintdesk commands in an isolated temp directory
pub struct DeskTest {
    pub temp_dir: TempDir,
    binary_path: &'static str,
}

impl DeskTest {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        DeskTest {
            temp_dir,
            binary_path: env!("CARGO_BIN_EXE_sprintdesk"),
        }
    }

    pub fn run(&self, args: &[&str]) -> Output {
        Command::new(self.binary_path)
            .args(args)
            .current_dir(self.temp_dir.path())
            .env(
                "SPRINTDESK_CONFIG",
                self.temp_dir.path().join("config.yaml"),
            )
            .env("SPRINTDESK_USER", "tester")
            .env("NO_COLOR", "1")
            .output()
            .expect("Failed to execute sprintdesk command")
    }

    pub fn run_success(&self, args: &[&str]) -> String {
        let output = self.run(args);
        if !output.status.success() {
            panic!(
                "Command {:?} failed with status {:?}\nstdout: {}\nstderr: {}",
                args,
                output.status,
                String::from_utf8_lossy(&output.stdout),
                String::from_utf8_lossy(&output.stderr)
            );
        }
        String::from_utf8_lossy(&output.stdout).to_string()
    }

    pub fn run_failure(&self, args: &[&str]) -> String {
        let output = self.run(args);
        assert!(
            !output.status.success(),
            "Command {:?} should have failed but succeeded\nstdout: {}",
            args,
            String::from_utf8_lossy(&output.stdout)
        );
        String::from_utf8_lossy(&output.stderr).to_string()
    }

    pub fn board_path(&self) -> String {
        self.temp_dir
            .path()
            .join("board.yaml")
            .to_string_lossy()
            .to_string()
    }

    pub fn write_board(&self, content: &str) {
        fs::write(self.board_path(), content).expect("Failed to write board");
    }

    pub fn read_board(&self) -> String {
        fs::read_to_string(self.board_path()).expect("Failed to read board")
    }
}
