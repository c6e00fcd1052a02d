#![allow(dead_code)]

use std::path::{Path, PathBuf};
use tempfile::TempDir;

/// A temporary Go project plus an isolated data directory and config file.
pub struct TestProject {
    pub dir: TempDir,
    pub data: TempDir,
}

impl TestProject {
    pub fn new() -> Self {
        let dir = TempDir::new().expect("failed to create temp dir");
        let data = TempDir::new().expect("failed to create data dir");
        std::fs::write(data.path().join("config.toml"), "").expect("failed to write config");
        Self { dir, data }
    }

    pub fn path(&self) -> &Path {
        self.dir.path()
    }

    pub fn data_dir(&self) -> &Path {
        self.data.path()
    }

    /// Empty config file so the user's own config never leaks into a test
    pub fn config_path(&self) -> PathBuf {
        self.data.path().join("config.toml")
    }

    /// Write a file relative to the project root, creating parent dirs as needed.
    pub fn write_file(&self, relative_path: &str, content: &str) {
        let full = self.dir.path().join(relative_path);
        if let Some(parent) = full.parent() {
            std::fs::create_dir_all(parent).expect("failed to create parent dirs");
        }
        std::fs::write(&full, content).expect("failed to write file");
    }

    /// Two parsable packages and one file with a syntax error.
    pub fn write_go_fixtures(&self) {
        self.write_file(
            "math/math.go",
            r#"package math

// Add adds two integers.
func Add(a int, b int) int {
	return a + b
}

// Sum totals any number of values.
func Sum(values ...int) (total int) {
	for _, v := range values {
		total += v
	}
	return
}
"#,
        );

        self.write_file(
            "greet/greet.go",
            r#"package greet

import "fmt"

// Greeter prints greetings.
type Greeter struct{ prefix string }

// Hello greets name using the configured prefix.
func (g *Greeter) Hello(name string) string {
	return fmt.Sprintf("%s %s", g.prefix, name)
}
"#,
        );

        self.write_file("broken/broken.go", "package broken\n\nfunc Broken( {\n");
    }

    /// Path to the compiled codescribe binary.
    pub fn codescribe_bin() -> PathBuf {
        PathBuf::from(env!("CARGO_BIN_EXE_codescribe"))
    }

    /// Command with `--config` and `--data-dir` pointed at this project's temp dirs.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::Command::new(Self::codescribe_bin());
        cmd.env_remove("CODESCRIBE_CONFIG")
            .env_remove("CODESCRIBE_DATA_DIR")
            .env_remove("GEMINI_API_KEY")
            .arg("--config")
            .arg(self.config_path())
            .arg("--data-dir")
            .arg(self.data_dir());
        cmd
    }
}
