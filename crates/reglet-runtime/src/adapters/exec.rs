//! Subprocess execution adapter.

use reglet_types::wire::{ExecRequest, ExecResponse};
use reglet_types::ErrorDetail;
use std::time::Duration;
use tokio::process::Command;
use tokio::time::timeout;

pub async fn run(request: &ExecRequest, timeout_ms: Option<u64>) -> ExecResponse {
    let budget = Duration::from_millis(timeout_ms.unwrap_or(30_000));
    let mut command = Command::new(&request.command);
    command.args(&request.args);

    match timeout(budget, command.output()).await {
        Ok(Ok(output)) => ExecResponse {
            exit_code: output.status.code().unwrap_or(-1),
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            error: None,
        },
        Ok(Err(e)) => ExecResponse {
            exit_code: -1,
            stdout: String::new(),
            stderr: String::new(),
            error: Some(ErrorDetail::new(
                reglet_types::ErrorKind::Exec,
                "exec_spawn_failed",
                e.to_string(),
            )),
        },
        Err(_) => ExecResponse {
            exit_code: -1,
            stdout: String::new(),
            stderr: String::new(),
            error: Some(ErrorDetail::timeout(
                "exec_timeout",
                format!("{} exceeded its budget", request.command),
            )),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn successful_command_reports_its_exit_code_and_stdout() {
        let response = run(
            &ExecRequest {
                command: "echo".to_string(),
                args: vec!["hello".to_string()],
            },
            Some(5_000),
        )
        .await;
        assert!(response.error.is_none());
        assert_eq!(response.exit_code, 0);
        assert_eq!(response.stdout.trim(), "hello");
    }

    #[tokio::test]
    async fn missing_binary_is_reported_as_an_exec_error() {
        let response = run(
            &ExecRequest {
                command: "this-binary-does-not-exist-anywhere".to_string(),
                args: vec![],
            },
            Some(2_000),
        )
        .await;
        assert!(response.error.is_some());
        assert_eq!(response.exit_code, -1);
    }
}
