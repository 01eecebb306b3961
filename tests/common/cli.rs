#![allow(dead_code)]

use assert_cmd::Command;
use std::ffi::OsStr;
use std::fs;
use std::path::PathBuf;
use tempfile::TempDir;

/// Scratch working directory for one CLI invocation.
pub struct CliWorkspace {
    pub temp_dir: TempDir,
    pub root: PathBuf,
}

impl CliWorkspace {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir");
        let root = temp_dir.path().to_path_buf();
        Self { temp_dir, root }
    }

    /// Write `JiraCredentials.json` into the workspace.
    pub fn write_credentials(&self, contents: &str) -> PathBuf {
        let path = self.root.join("JiraCredentials.json");
        fs::write(&path, contents).expect("write credentials");
        path
    }

    /// Credentials pointing at a port nothing listens on.
    pub fn write_unreachable_credentials(&self) -> PathBuf {
        self.write_credentials(
            r#"{"email": "dev@example.com", "api_token": "token", "jira_url": "http://127.0.0.1:1"}"#,
        )
    }
}

pub fn jbulk<I, S>(workspace: &CliWorkspace, args: I) -> Command
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("jbulk"));
    cmd.current_dir(&workspace.root);
    cmd.args(args);
    cmd.env_remove("JBULK_CREDENTIALS");
    cmd.env("NO_COLOR", "1");
    cmd.env("RUST_LOG", "jira_bulk=debug");
    cmd
}
