use std::process::Stdio;
use std::time::Duration;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;
use tracing::debug;
use tutor_core::{Result, TutorError};

pub(crate) const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Run an argv-style command, replacing `{name}` placeholders inside each
/// argument, optionally feeding `stdin`. Returns stdout.
pub(crate) async fn run_command(
    argv: &[String],
    replacements: &[(&str, &str)],
    stdin: Option<&[u8]>,
    timeout_secs: u64,
) -> Result<Vec<u8>> {
    let (program, args) = argv
        .split_first()
        .ok_or_else(|| TutorError::Speech("Empty command".to_string()))?;

    let args: Vec<String> = args
        .iter()
        .map(|arg| {
            replacements
                .iter()
                .fold(arg.clone(), |acc, (key, value)| acc.replace(key, value))
        })
        .collect();

    debug!("Running speech command: {} ({} args)", program, args.len());

    let mut cmd = Command::new(program);
    cmd.args(&args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .stdin(if stdin.is_some() { Stdio::piped() } else { Stdio::null() })
        .kill_on_drop(true);

    let mut child = cmd
        .spawn()
        .map_err(|e| TutorError::Speech(format!("Failed to start '{}': {}", program, e)))?;

    if let (Some(input), Some(mut pipe)) = (stdin, child.stdin.take()) {
        pipe.write_all(input)
            .await
            .map_err(|e| TutorError::Speech(format!("Failed to write to '{}': {}", program, e)))?;
        // Closing stdin lets the engine see end of input.
        drop(pipe);
    }

    let output = match tokio::time::timeout(Duration::from_secs(timeout_secs), child.wait_with_output()).await {
        Ok(Ok(output)) => output,
        Ok(Err(e)) => {
            return Err(TutorError::Speech(format!("'{}' failed: {}", program, e)));
        }
        Err(_) => {
            return Err(TutorError::Speech(format!(
                "'{}' timed out after {} seconds",
                program, timeout_secs
            )));
        }
    };

    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        return Err(TutorError::Speech(format!(
            "'{}' exited with {}: {}",
            program,
            output.status,
            stderr.trim()
        )));
    }

    Ok(output.stdout)
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn argv(parts: &[&str]) -> Vec<String> {
        parts.iter().map(|s| s.to_string()).collect()
    }

    #[tokio::test]
    async fn test_placeholder_replacement() {
        let out = run_command(&argv(&["echo", "say:{text}"]), &[("{text}", "hello")], None, 5)
            .await
            .unwrap();
        assert_eq!(String::from_utf8(out).unwrap().trim(), "say:hello");
    }

    #[tokio::test]
    async fn test_stdin_is_forwarded() {
        let out = run_command(&argv(&["cat"]), &[], Some(b"piped text"), 5).await.unwrap();
        assert_eq!(out, b"piped text");
    }

    #[tokio::test]
    async fn test_non_zero_exit_is_error() {
        let err = run_command(&argv(&["false"]), &[], None, 5).await.unwrap_err();
        assert!(matches!(err, TutorError::Speech(_)));
    }

    #[tokio::test]
    async fn test_missing_program_is_error() {
        let err = run_command(&argv(&["definitely-not-a-tts-engine"]), &[], None, 5)
            .await
            .unwrap_err();
        assert!(err.to_string().contains("Failed to start"));
    }

    #[tokio::test]
    async fn test_empty_command_is_error() {
        assert!(run_command(&[], &[], None, 5).await.is_err());
    }
}
