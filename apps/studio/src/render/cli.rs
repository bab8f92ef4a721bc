//! Local engine backed by the `typst` command-line compiler.
//!
//! Each render runs in a fresh temporary directory:
//! `typst compile --format svg [--font-path DIR] main.typ page-{p}.svg`.
//! Only the first page is returned; the editor paginates its own surface.
//!
//! Module locations map onto the CLI as follows: the compiler module is the
//! path of the `typst` binary, the renderer module an optional font directory.

use std::path::PathBuf;

use async_trait::async_trait;
use tokio::process::Command;
use tracing::{debug, info};

use crate::render::engine::{EngineError, EngineLoader, RenderInput, RendererHandle};

const SOURCE_FILE: &str = "main.typ";
const OUTPUT_PATTERN: &str = "page-{p}.svg";
const FIRST_PAGE: &str = "page-1.svg";

#[derive(Debug, Clone)]
pub struct CliEngine {
    binary: PathBuf,
    font_path: Option<PathBuf>,
}

impl CliEngine {
    pub fn new() -> Self {
        Self {
            binary: PathBuf::from("typst"),
            font_path: None,
        }
    }
}

impl Default for CliEngine {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RendererHandle for CliEngine {
    async fn configure_compiler(&mut self, module_location: &str) -> Result<(), EngineError> {
        if !module_location.is_empty() {
            self.binary = PathBuf::from(module_location);
        }

        let output = Command::new(&self.binary)
            .arg("--version")
            .output()
            .await
            .map_err(|e| {
                EngineError::Configuration(format!("cannot run {}: {e}", self.binary.display()))
            })?;

        if !output.status.success() {
            return Err(EngineError::Configuration(format!(
                "{} --version exited with {}",
                self.binary.display(),
                output.status
            )));
        }

        info!(
            "Using {}",
            String::from_utf8_lossy(&output.stdout).trim()
        );
        Ok(())
    }

    async fn configure_renderer(&mut self, module_location: &str) -> Result<(), EngineError> {
        self.font_path = if module_location.is_empty() {
            None
        } else {
            Some(PathBuf::from(module_location))
        };
        Ok(())
    }

    async fn render_to_svg(&self, input: &RenderInput) -> Result<String, EngineError> {
        let source = match input {
            RenderInput::Source(s) => s,
            RenderInput::Artifact(_) => {
                return Err(EngineError::UnsupportedInput(
                    "the typst CLI compiles source only".to_string(),
                ))
            }
        };

        let dir = tempfile::tempdir()?;
        tokio::fs::write(dir.path().join(SOURCE_FILE), source).await?;

        let mut cmd = Command::new(&self.binary);
        cmd.current_dir(dir.path())
            .arg("compile")
            .arg("--format")
            .arg("svg");
        if let Some(fonts) = &self.font_path {
            cmd.arg("--font-path").arg(fonts);
        }
        cmd.arg(SOURCE_FILE).arg(OUTPUT_PATTERN);

        debug!("Running {:?}", cmd.as_std());
        let output = cmd.output().await?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(EngineError::Compile(stderr.trim().to_string()));
        }

        Ok(tokio::fs::read_to_string(dir.path().join(FIRST_PAGE)).await?)
    }

    fn backend(&self) -> &'static str {
        "typst-cli"
    }
}

/// Loader for [`CliEngine`]. The binary is checked during configuration.
pub struct CliLoader;

#[async_trait]
impl EngineLoader for CliLoader {
    async fn load(&self) -> Result<Option<Box<dyn RendererHandle>>, EngineError> {
        Ok(Some(Box::new(CliEngine::new())))
    }
}
