//! Build toolchain abstraction
//!
//! The installer drives cargo through the [`Toolchain`] trait so the
//! pipeline can be exercised without compiling a real workspace.

mod cargo;
mod runtime;

pub use cargo::CargoToolchain;
pub use runtime::{OutputSink, Toolchain};

use crate::error::{LedgerOpsError, LedgerOpsResult};
use std::collections::VecDeque;
use tokio::io::{AsyncBufReadExt, BufReader};

/// Max number of output lines to include in failure diagnostics.
const ERROR_TAIL_LINES: usize = 50;

/// Extract the useful tail of a failed command's output.
///
/// Returns the last `ERROR_TAIL_LINES` lines so failures stay readable
/// without replaying an entire build log.
pub fn error_tail(lines: &[String]) -> String {
    let start = lines.len().saturating_sub(ERROR_TAIL_LINES);
    lines[start..].join("\n")
}

/// Render a command line the way a shell trace would show it.
pub fn display_command(program: &str, args: &[String]) -> String {
    std::iter::once(program.to_string())
        .chain(args.iter().map(|arg| {
            if arg.is_empty() || arg.contains(char::is_whitespace) {
                format!("{arg:?}")
            } else {
                arg.clone()
            }
        }))
        .collect::<Vec<_>>()
        .join(" ")
}

/// Stream stdout+stderr from a child process, calling `on_output` for each line.
///
/// Returns only the last `ERROR_TAIL_LINES` lines for error reporting, so a
/// long build log is never held in memory.
pub(crate) async fn stream_child_output(
    child: &mut tokio::process::Child,
    on_output: OutputSink<'_>,
) -> LedgerOpsResult<Vec<String>> {
    let stderr = child
        .stderr
        .take()
        .ok_or_else(|| LedgerOpsError::Internal("child stderr not piped".to_string()))?;
    let stdout = child
        .stdout
        .take()
        .ok_or_else(|| LedgerOpsError::Internal("child stdout not piped".to_string()))?;

    let mut stderr_reader = BufReader::new(stderr).lines();
    let mut stdout_reader = BufReader::new(stdout).lines();

    let mut tail = VecDeque::with_capacity(ERROR_TAIL_LINES);
    let mut stderr_done = false;
    let mut stdout_done = false;

    while !stderr_done || !stdout_done {
        tokio::select! {
            line = stderr_reader.next_line(), if !stderr_done => {
                match line {
                    Ok(Some(line)) => {
                        on_output(line.clone());
                        push_tail(&mut tail, line);
                    }
                    _ => stderr_done = true,
                }
            }
            line = stdout_reader.next_line(), if !stdout_done => {
                match line {
                    Ok(Some(line)) => {
                        on_output(line.clone());
                        push_tail(&mut tail, line);
                    }
                    _ => stdout_done = true,
                }
            }
        }
    }

    Ok(tail.into())
}

fn push_tail(tail: &mut VecDeque<String>, line: String) {
    if tail.len() == ERROR_TAIL_LINES {
        tail.pop_front();
    }
    tail.push_back(line);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_tail_keeps_last_lines() {
        let lines: Vec<String> = (0..120).map(|i| format!("line {i}")).collect();
        let tail = error_tail(&lines);
        assert_eq!(tail.lines().count(), ERROR_TAIL_LINES);
        assert!(tail.starts_with("line 70"));
        assert!(tail.ends_with("line 119"));
    }

    #[test]
    fn error_tail_short_output() {
        let lines = vec!["error[E0425]: cannot find value".to_string()];
        assert_eq!(error_tail(&lines), "error[E0425]: cannot find value");
        assert_eq!(error_tail(&[]), "");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn streamed_output_retains_only_tail() {
        let mut child = tokio::process::Command::new("seq")
            .args(["1", "120"])
            .stdout(std::process::Stdio::piped())
            .stderr(std::process::Stdio::piped())
            .spawn()
            .unwrap();

        let seen = std::sync::atomic::AtomicUsize::new(0);
        let tail = stream_child_output(&mut child, &|_line| {
            seen.fetch_add(1, std::sync::atomic::Ordering::SeqCst);
        })
        .await
        .unwrap();
        child.wait().await.unwrap();

        assert_eq!(seen.load(std::sync::atomic::Ordering::SeqCst), 120);
        assert_eq!(tail.len(), ERROR_TAIL_LINES);
        assert_eq!(tail.first().map(String::as_str), Some("71"));
        assert_eq!(tail.last().map(String::as_str), Some("120"));
    }

    #[test]
    fn display_command_quotes_empty_features() {
        let args = vec![
            "build".to_string(),
            "--features".to_string(),
            String::new(),
        ];
        assert_eq!(display_command("cargo", &args), "cargo build --features \"\"");
    }
}
