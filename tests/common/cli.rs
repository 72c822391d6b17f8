use assert_cmd::Command;
use std::ffi::OsStr;
use std::fs;
use std::path::PathBuf;
use std::time::{Duration, Instant, SystemTime};
use tempfile::TempDir;

#[derive(Debug)]
pub struct StRun {
    pub stdout: String,
    pub stderr: String,
    pub status: std::process::ExitStatus,
    pub duration: Duration,
    pub log_path: PathBuf,
}

impl StRun {
    pub fn json(&self) -> serde_json::Value {
        serde_json::from_str(&extract_json_payload(&self.stdout)).expect("stdout is JSON")
    }

    pub fn error_json(&self) -> serde_json::Value {
        serde_json::from_str(&extract_json_payload(&self.stderr)).expect("stderr is JSON")
    }
}

pub struct StWorkspace {
    pub temp_dir: TempDir,
    pub root: PathBuf,
    pub log_dir: PathBuf,
}

impl StWorkspace {
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("temp dir");
        let root = temp_dir.path().to_path_buf();
        let log_dir = root.join("logs");
        fs::create_dir_all(&log_dir).expect("log dir");
        Self {
            temp_dir,
            root,
            log_dir,
        }
    }

    /// A workspace with `st init` already run.
    pub fn initialized() -> Self {
        let workspace = Self::new();
        let run = run_st(&workspace, ["init"], "init");
        assert!(run.status.success(), "init failed: {}", run.stderr);
        workspace
    }
}

pub fn run_st<I, S>(workspace: &StWorkspace, args: I, label: &str) -> StRun
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
{
    run_st_with_env(
        workspace,
        args,
        std::iter::empty::<(String, String)>(),
        label,
    )
}

pub fn run_st_with_env<I, S, E, K, V>(
    workspace: &StWorkspace,
    args: I,
    env_vars: E,
    label: &str,
) -> StRun
where
    I: IntoIterator<Item = S>,
    S: AsRef<OsStr>,
    E: IntoIterator<Item = (K, V)>,
    K: AsRef<OsStr>,
    V: AsRef<OsStr>,
{
    let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("st"));
    cmd.current_dir(&workspace.root);
    cmd.args(args);
    cmd.env_remove("SPLITTICKET_DIR");
    cmd.env("NO_COLOR", "1");
    cmd.env("RUST_LOG", "splitticket=debug");
    cmd.env("RUST_BACKTRACE", "1");
    cmd.env("HOME", &workspace.root);
    cmd.env("USER", "tester");
    cmd.envs(env_vars);

    let start = Instant::now();
    let output = cmd.output().expect("run st");
    let duration = start.elapsed();

    let stdout = String::from_utf8_lossy(&output.stdout).to_string();
    let stderr = String::from_utf8_lossy(&output.stderr).to_string();

    let log_path = workspace.log_dir.join(format!("{label}.log"));
    let timestamp = SystemTime::now();
    let log_body = format!(
        "label: {label}\nstarted: {:?}\nduration: {:?}\nstatus: {}\nargs: {:?}\ncwd: {}\n\nstdout:\n{}\n\nstderr:\n{}\n",
        timestamp,
        duration,
        output.status,
        cmd.get_args().collect::<Vec<_>>(),
        workspace.root.display(),
        stdout,
        stderr
    );
    fs::write(&log_path, log_body).expect("write log");

    StRun {
        stdout,
        stderr,
        status: output.status,
        duration,
        log_path,
    }
}

/// Strip anything printed before the JSON document (log lines, notices).
pub fn extract_json_payload(stdout: &str) -> String {
    let lines: Vec<&str> = stdout.lines().collect();
    for (idx, line) in lines.iter().enumerate() {
        let trimmed = line.trim_start();
        if trimmed.starts_with('[') || trimmed.starts_with('{') {
            return lines[idx..].join("\n").trim().to_string();
        }
    }
    stdout.trim().to_string()
}
