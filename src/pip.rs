//! Package installation through an interpreter's pip.

use crate::error::{EmbedError, Result};
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Command;

/// GPU build of torch and its companions, installed in this order.
pub const TORCH_SUITE: [&str; 3] = ["torch", "torchvision", "torchaudio"];

/// Wrapper for running `python -m pip install`.
pub struct PipInstaller {
    python: PathBuf,
}

impl PipInstaller {
    /// Create an installer for the given interpreter.
    ///
    /// Bare names such as `python` are resolved through `PATH` when possible;
    /// otherwise the value is used as given.
    pub fn new(python: impl AsRef<Path>) -> Self {
        let python = python.as_ref();
        let resolved = which::which(python).unwrap_or_else(|_| python.to_path_buf());
        tracing::debug!("using interpreter {}", resolved.display());
        Self { python: resolved }
    }

    /// Get the path to the interpreter.
    pub fn python(&self) -> &Path {
        &self.python
    }

    /// Arguments passed to the interpreter for installing `package`.
    pub fn install_args(package: &str, extra_args: &[String]) -> Vec<OsString> {
        let mut args: Vec<OsString> = ["-m", "pip", "install", package, "--no-warn-script-location"]
            .into_iter()
            .map(OsString::from)
            .collect();
        args.extend(extra_args.iter().map(OsString::from));
        args
    }

    /// Install one requirement specifier, blocking until pip exits.
    pub fn install(&self, package: &str, extra_args: &[String]) -> Result<()> {
        let args = Self::install_args(package, extra_args);
        self.log_execution(&args);

        let status = Command::new(&self.python)
            .args(&args)
            .status()
            .map_err(|e| EmbedError::Install {
                package: package.to_string(),
                message: e.to_string(),
            })?;

        if !status.success() {
            return Err(EmbedError::Install {
                package: package.to_string(),
                message: format!(
                    "Command '{} {}' returned {}",
                    self.python.display(),
                    display_args(&args),
                    status
                ),
            });
        }

        println!("Package '{}' installed successfully.", package);
        Ok(())
    }

    /// Install [`TORCH_SUITE`] from `index_url`.
    pub fn install_torch_suite(&self, index_url: &str) -> Result<()> {
        let extra = vec!["--index-url".to_string(), index_url.to_string()];
        for package in TORCH_SUITE {
            self.install(package, &extra)?;
        }
        Ok(())
    }

    /// Install every specifier in order, stopping at the first failure.
    pub fn install_all(&self, requirements: &[String]) -> Result<()> {
        for requirement in requirements {
            self.install(requirement, &[])?;
        }
        Ok(())
    }

    fn log_execution(&self, args: &[OsString]) {
        tracing::debug!(
            "Executing: {} {}",
            self.python.display(),
            display_args(args)
        );
    }
}

fn display_args(args: &[OsString]) -> String {
    args.iter()
        .map(|a| a.to_string_lossy())
        .collect::<Vec<_>>()
        .join(" ")
}
