// gallery-dl runner - the external short-link tool
//
// Invoked as `gallery-dl -g <url>`, which prints direct locators one per
// line without downloading anything.

use async_trait::async_trait;
use std::process::Command as StdCommand;
use std::time::Duration;
use tracing::debug;

use crate::resolver::config::ResolverConfig;
use crate::resolver::errors::ResolveError;
use crate::resolver::traits::CommandRunner;
use crate::resolver::utils::run_output_with_timeout;

/// Runs the gallery-dl binary with a bounded lifetime
pub struct GalleryDlRunner {
    program: String,
    timeout: Duration,
}

impl GalleryDlRunner {
    pub fn new(config: &ResolverConfig) -> Self {
        Self {
            program: config
                .gallery_dl_path
                .clone()
                .unwrap_or_else(Self::find_gallery_dl),
            timeout: config.process_timeout,
        }
    }

    pub fn program(&self) -> &str {
        &self.program
    }

    /// Find gallery-dl binary
    fn find_gallery_dl() -> String {
        let common_paths = [
            "/opt/homebrew/bin/gallery-dl", // Homebrew on Apple Silicon
            "/usr/local/bin/gallery-dl",    // pip / Homebrew on Intel Mac
            "/usr/bin/gallery-dl",          // System installation
        ];

        for path in common_paths {
            if std::path::Path::new(path).exists() {
                return path.to_string();
            }
        }

        // Try to find via `which`
        if let Ok(output) = StdCommand::new("which").arg("gallery-dl").output() {
            if output.status.success() {
                if let Ok(path) = String::from_utf8(output.stdout) {
                    let trimmed = path.trim();
                    if !trimmed.is_empty() {
                        return trimmed.to_string();
                    }
                }
            }
        }

        "gallery-dl".to_string()
    }

    fn build_args(url: &str) -> Vec<String> {
        vec!["-g".to_string(), url.to_string()]
    }
}

#[async_trait]
impl CommandRunner for GalleryDlRunner {
    fn name(&self) -> &'static str {
        "gallery-dl"
    }

    async fn run(&self, url: &str) -> Result<String, ResolveError> {
        let args = Self::build_args(url);
        debug!(program = %self.program, ?args, "running short-link tool");

        let out = run_output_with_timeout(&self.program, args, self.timeout).await?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            return Err(ResolveError::Execution(format!(
                "{} exited with {}: {}",
                self.name(),
                out.status,
                stderr.trim()
            )));
        }

        Ok(String::from_utf8_lossy(&out.stdout).into_owned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_build_args() {
        assert_eq!(
            GalleryDlRunner::build_args("https://pin.it/abc"),
            vec!["-g", "https://pin.it/abc"]
        );
    }

    #[test]
    fn test_explicit_path_wins() {
        let config = ResolverConfig::default()
            .with_gallery_dl_path(Some("/custom/gallery-dl".to_string()));
        assert_eq!(GalleryDlRunner::new(&config).program(), "/custom/gallery-dl");
    }

    #[tokio::test]
    async fn test_missing_binary_is_an_error() {
        let config = ResolverConfig::default()
            .with_gallery_dl_path(Some("/nonexistent/gallery-dl".to_string()));
        let runner = GalleryDlRunner::new(&config);
        assert!(runner.run("https://pin.it/abc").await.is_err());
    }
}
