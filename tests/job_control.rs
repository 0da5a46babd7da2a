use std::io::{Read, Write};
use std::process::{Command, Stdio};
use std::time::Duration;

fn run_shell(lines: &[&str]) -> std::process::Output {
    let mut child = Command::new(env!("CARGO_BIN_EXE_jcsh"))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn jcsh");

    {
        let stdin = child.stdin.as_mut().expect("stdin");
        for line in lines {
            writeln!(stdin, "{line}").expect("write line");
        }
    }

    child.wait_with_output().expect("wait output")
}

/// Isolates `$HOME` for the duration of the guard, restoring the previous
/// value (or removing the variable) on drop.
struct TempHome {
    previous: Option<String>,
    dir: std::path::PathBuf,
}

impl TempHome {
    fn new(name: &str) -> Self {
        let previous = std::env::var("HOME").ok();
        let dir = std::env::temp_dir().join(format!("jcsh_test_home_{name}_{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        unsafe { std::env::set_var("HOME", &dir) };
        Self { previous, dir }
    }
}

impl Drop for TempHome {
    fn drop(&mut self) {
        unsafe {
            match &self.previous {
                Some(value) => std::env::set_var("HOME", value),
                None => std::env::remove_var("HOME"),
            }
        }
        let _ = std::fs::remove_dir_all(&self.dir);
    }
}

#[test]
fn echo_prints_its_arguments() {
    let output = run_shell(&["echo hello"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("hello\n"), "stdout was: {stdout}");
}

#[test]
fn eof_exits_with_status_zero() {
    let output = run_shell(&["echo hi"]);
    assert!(output.status.success());
}

#[test]
fn quit_exits_the_shell() {
    let output = run_shell(&["quit"]);
    assert!(output.status.success());
}

#[test]
fn pipeline_with_redirection_writes_expected_file() {
    let dir = std::env::temp_dir();
    let in_path = dir.join(format!("jcsh_test_in_{}.txt", std::process::id()));
    let out_path = dir.join(format!("jcsh_test_out_{}.txt", std::process::id()));
    std::fs::write(&in_path, b"hello\n").unwrap();

    let line = format!("cat < {} | tr a-z A-Z > {}", in_path.display(), out_path.display());
    let output = run_shell(&[&line]);
    assert!(output.status.success());

    let contents = std::fs::read_to_string(&out_path).expect("output file written");
    assert_eq!(contents, "HELLO\n");

    let _ = std::fs::remove_file(&in_path);
    let _ = std::fs::remove_file(&out_path);
}

#[test]
fn cd_to_nonexistent_path_reports_reason_then_path() {
    let _home = TempHome::new("cd_error");
    let output = run_shell(&["cd /definitely/not/a/real/path"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(
        stderr.contains("cd: ") && stderr.contains(": /definitely/not/a/real/path"),
        "stderr was: {stderr}"
    );
}

#[test]
fn cd_with_no_argument_goes_to_home() {
    let home = TempHome::new("cd_bare");
    let marker = home.dir.join("marker_file");
    std::fs::write(&marker, b"x").unwrap();

    let output = run_shell(&["cd", "echo after cd"]);
    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("after cd"), "stdout was: {stdout}");
}

#[test]
fn background_job_is_announced_then_reported_finished() {
    let output = run_shell(&["true &", "sleep 0.3", "jobs"]);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("[1] running 'true'"), "stdout was: {stdout}");
    assert!(stdout.contains("exited, status=0"), "stdout was: {stdout}");
}

#[test]
fn kill_on_unknown_job_reports_error() {
    let output = run_shell(&["kill %99"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("kill:"), "stderr was: {stderr}");
}

#[test]
fn kill_requires_percent_prefixed_job_argument() {
    let output = run_shell(&["kill 1"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("usage"), "stderr was: {stderr}");
}

#[test]
fn fg_on_unknown_job_reports_error_and_returns_to_prompt() {
    let output = run_shell(&["fg 7", "echo still alive"]);
    let stderr = String::from_utf8_lossy(&output.stderr);
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stderr.contains("fg:"), "stderr was: {stderr}");
    assert!(stdout.contains("still alive"), "stdout was: {stdout}");
}

#[test]
fn prompt_is_written_before_each_line_is_read() {
    let mut child = Command::new(env!("CARGO_BIN_EXE_jcsh"))
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("spawn jcsh");

    std::thread::sleep(Duration::from_millis(100));
    {
        let stdin = child.stdin.as_mut().unwrap();
        writeln!(stdin, "quit").unwrap();
    }

    let mut stdout = child.stdout.take().unwrap();
    let mut buf = String::new();
    stdout.read_to_string(&mut buf).ok();
    let _ = child.wait();

    assert!(buf.starts_with("# "), "stdout was: {buf:?}");
}
