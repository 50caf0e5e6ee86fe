//! TestWorld pattern for declarative integration test setup.
//!
//! Provides a fluent interface for:
//! - Creating an isolated bucket root on disk
//! - Writing objects with controlled sizes and modification times
//! - Writing the configuration file
//! - Executing CLI commands against that environment

use anyhow::{Context, Result};
use assert_cmd::Command;
use chrono::{DateTime, TimeDelta, TimeZone, Utc};
use filetime::FileTime;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use watchmen_store::FsStore;

/// Declarative test environment builder.
///
/// # Example
/// ```no_run
/// use chrono::TimeDelta;
/// use watchmen_testing::TestWorld;
///
/// let world = TestWorld::new()
///     .with_object("lake", "orders/2025/03/10/orders.json", 2048, TimeDelta::hours(1))
///     .with_config("[[schedules]]\ncadence = \"Daily\"\nat = \"15:00\"\n");
///
/// let result = world.run(&["config", "check"]).unwrap();
/// assert!(result.success());
/// ```
pub struct TestWorld {
    temp_dir: TempDir,
    bucket_root: PathBuf,
    results_dir: PathBuf,
    config_path: PathBuf,
    now: DateTime<Utc>,
    env_vars: HashMap<String, String>,
}

impl Default for TestWorld {
    fn default() -> Self {
        Self::new()
    }
}

impl TestWorld {
    /// Create a new isolated test environment anchored at 2025-03-10T15:00:00Z.
    pub fn new() -> Self {
        let now = Utc
            .with_ymd_and_hms(2025, 3, 10, 15, 0, 0)
            .single()
            .expect("valid reference time");
        Self::at(now)
    }

    /// Create a test environment whose object ages are relative to `now`.
    pub fn at(now: DateTime<Utc>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let base_path = temp_dir.path().to_path_buf();
        let bucket_root = base_path.join("buckets");
        let results_dir = base_path.join("results");

        std::fs::create_dir_all(&bucket_root).expect("Failed to create bucket root");

        Self {
            config_path: base_path.join("watchmen.toml"),
            temp_dir,
            bucket_root,
            results_dir,
            now,
            env_vars: HashMap::new(),
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        self.now
    }

    /// `--now` value for commands run in this world.
    pub fn now_arg(&self) -> String {
        self.now.to_rfc3339()
    }

    pub fn bucket_root(&self) -> &Path {
        &self.bucket_root
    }

    pub fn results_dir(&self) -> &Path {
        &self.results_dir
    }

    pub fn config_path(&self) -> &Path {
        &self.config_path
    }

    pub fn temp_dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Set an environment variable for commands run in this world.
    pub fn with_env(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.env_vars.insert(key.into(), value.into());
        self
    }

    /// Create an empty bucket.
    pub fn with_bucket(self, bucket: &str) -> Self {
        std::fs::create_dir_all(self.bucket_root.join(bucket)).expect("Failed to create bucket");
        self
    }

    /// Write an object of `size` bytes last modified `age` before [`TestWorld::now`].
    pub fn with_object(self, bucket: &str, key: &str, size: usize, age: TimeDelta) -> Self {
        self.write_object(bucket, key, size, age)
            .expect("Failed to write object");
        self
    }

    pub fn write_object(
        &self,
        bucket: &str,
        key: &str,
        size: usize,
        age: TimeDelta,
    ) -> Result<PathBuf> {
        let path = self.bucket_root.join(bucket).join(key);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, vec![b'x'; size])?;

        let modified = self.now - age;
        let mtime = FileTime::from_unix_time(modified.timestamp(), modified.timestamp_subsec_nanos());
        filetime::set_file_mtime(&path, mtime)
            .with_context(|| format!("Failed to set mtime on {}", path.display()))?;
        Ok(path)
    }

    /// Write the configuration file used by [`TestWorld::configure_command`].
    pub fn with_config(self, toml: &str) -> Self {
        std::fs::write(&self.config_path, toml).expect("Failed to write config");
        self
    }

    /// Filesystem store over this world's bucket root.
    pub fn store(&self) -> FsStore {
        FsStore::new(&self.bucket_root)
    }

    /// Configure a CLI command with this test environment's settings.
    ///
    /// The caller must provide the base command (e.g., from `cargo_bin_cmd!("watchmen")`).
    /// This method points it at the world's config file and bucket root.
    pub fn configure_command<'a>(&self, cmd: &'a mut Command) -> &'a mut Command {
        cmd.arg("--config")
            .arg(&self.config_path)
            .arg("--bucket-root")
            .arg(&self.bucket_root);

        cmd.current_dir(self.temp_dir.path());
        cmd.env_remove("WATCHMEN_CONFIG");

        for (key, value) in &self.env_vars {
            cmd.env(key, value);
        }

        cmd
    }

    /// Execute a command using the project's binary and return the result.
    ///
    /// # Note
    /// This method uses `Command::cargo_bin()` which requires the binary to be
    /// built, which cargo test does for the CLI package's own tests.
    #[allow(deprecated)]
    pub fn run(&self, args: &[&str]) -> Result<CliResult> {
        let mut cmd = Command::cargo_bin("watchmen")
            .map_err(|e| anyhow::anyhow!("Failed to find watchmen binary: {}", e))?;

        self.configure_command(&mut cmd);
        cmd.args(args);

        let output = cmd.output()?;

        Ok(CliResult {
            status: output.status,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
        })
    }
}

/// Result of a CLI command execution.
#[derive(Debug)]
pub struct CliResult {
    pub status: std::process::ExitStatus,
    pub stdout: String,
    pub stderr: String,
}

impl CliResult {
    pub fn success(&self) -> bool {
        self.status.success()
    }

    pub fn code(&self) -> Option<i32> {
        self.status.code()
    }

    /// Parse stdout as JSON.
    pub fn json(&self) -> Result<serde_json::Value> {
        serde_json::from_str(&self.stdout)
            .with_context(|| format!("stdout is not JSON:\n{}", self.stdout))
    }
}
