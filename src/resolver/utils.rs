// Helper functions shared by the resolver components

use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::Command as TokioCommand;
use tokio::time::timeout;

use super::config::ResolverConfig;
use super::errors::ResolveError;

/// Run a command to completion within `limit`.
///
/// The child is killed when the limit is hit and also whenever the returned
/// future is dropped early.
pub async fn run_output_with_timeout(
    program: &str,
    args: Vec<String>,
    limit: Duration,
) -> Result<std::process::Output, ResolveError> {
    let mut child = TokioCommand::new(program)
        .args(&args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true)
        .spawn()
        .map_err(|e| ResolveError::Execution(format!("Failed to start {}: {}", program, e)))?;

    let mut stdout_pipe = child.stdout.take().ok_or_else(|| {
        ResolveError::Execution(format!("Failed to capture stdout from {}", program))
    })?;
    let mut stderr_pipe = child.stderr.take().ok_or_else(|| {
        ResolveError::Execution(format!("Failed to capture stderr from {}", program))
    })?;

    let mut stdout_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stdout_pipe.read_to_end(&mut buf).await?;
        Ok::<Vec<u8>, std::io::Error>(buf)
    });
    let mut stderr_task = tokio::spawn(async move {
        let mut buf = Vec::new();
        stderr_pipe.read_to_end(&mut buf).await?;
        Ok::<Vec<u8>, std::io::Error>(buf)
    });

    // Pipes stay open while any descendant holds them, so the reads share
    // the limit with the wait.
    let waited = timeout(limit, async {
        let status = child.wait().await;
        let stdout = join_pipe(&mut stdout_task, "stdout").await;
        let stderr = join_pipe(&mut stderr_task, "stderr").await;
        (status, stdout, stderr)
    })
    .await;

    match waited {
        Ok((status_res, stdout, stderr)) => {
            let status = status_res.map_err(|e| {
                ResolveError::Execution(format!("Failed to wait for {}: {}", program, e))
            })?;
            Ok(std::process::Output {
                status,
                stdout: stdout?,
                stderr: stderr?,
            })
        }
        Err(_) => {
            if !matches!(child.try_wait(), Ok(Some(_))) {
                if let Err(e) = child.kill().await {
                    tracing::warn!(program, error = %e, "failed to kill timed-out process");
                }
            }
            stdout_task.abort();
            stderr_task.abort();
            Err(ResolveError::Timeout(limit.as_secs()))
        }
    }
}

async fn join_pipe(
    task: &mut tokio::task::JoinHandle<std::io::Result<Vec<u8>>>,
    which: &str,
) -> Result<Vec<u8>, ResolveError> {
    task.await
        .map_err(|e| ResolveError::Execution(format!("{} task failed: {}", which, e)))?
        .map_err(|e| ResolveError::Execution(format!("Failed to read {}: {}", which, e)))
}

/// First non-empty line of tool output, trimmed
pub fn first_line(output: &str) -> Option<&str> {
    output.lines().map(str::trim).find(|line| !line.is_empty())
}

/// HTTP client honoring the configured proxy and timeout
pub fn build_http_client(
    config: &ResolverConfig,
    request_timeout: Duration,
) -> Result<reqwest::Client, ResolveError> {
    let mut builder = reqwest::Client::builder().timeout(request_timeout);

    if let Some(proxy_url) = config.proxy.as_deref() {
        let proxy = reqwest::Proxy::all(proxy_url)?;
        builder = builder.proxy(proxy);
    }

    Ok(builder.build()?)
}
