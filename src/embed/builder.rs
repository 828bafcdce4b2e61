//! Embeddable environment builder.

use crate::config::Endpoints;
use crate::embed::download::{Downloader, DEFAULT_CACHE_DIR, GET_PIP_FILE_NAME};
use crate::error::{EmbedError, Result};
use std::fs::{self, File, OpenOptions};
use std::io::Write;
use std::path::{Path, PathBuf};
use std::process::Command;
use zip::ZipArchive;

/// Interpreter executable at the root of an embeddable distribution.
pub const INTERPRETER_NAME: &str = "python.exe";

/// Path file dropped into site-packages.
pub const PROJECT_PATH_PTH: &str = "project_path.pth";

/// Puts the directory of the running script first on `sys.path`.
pub const PROJECT_PATH_DIRECTIVE: &str =
    "import sys;import os;sys.path.insert(0,os.path.dirname(sys.argv[0]));";

/// Line enabling site-packages in the distribution's `._pth` file.
pub const IMPORT_SITE: &str = "import site";

/// Builder for an embeddable Python environment with pip installed.
pub struct EmbedEnvBuilder {
    target: PathBuf,
    version: String,
    cache_dir: PathBuf,
    endpoints: Endpoints,
}

impl EmbedEnvBuilder {
    /// Create a builder for `version` installed into `target`.
    pub fn new(target: PathBuf, version: impl Into<String>) -> Self {
        Self {
            target,
            version: version.into(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            endpoints: Endpoints::default(),
        }
    }

    /// Set the directory downloaded archives are kept in.
    pub fn cache_dir(mut self, cache_dir: PathBuf) -> Self {
        self.cache_dir = cache_dir;
        self
    }

    /// Set the remote endpoints.
    pub fn endpoints(mut self, endpoints: Endpoints) -> Self {
        self.endpoints = endpoints;
        self
    }

    /// Get the target directory.
    pub fn target(&self) -> &Path {
        &self.target
    }

    /// Path of the interpreter inside the target directory.
    pub fn interpreter(&self) -> PathBuf {
        self.target.join(INTERPRETER_NAME)
    }

    /// Build the environment and return its interpreter path.
    ///
    /// Steps run strictly in order; the first failure aborts the build.
    pub fn build(&self) -> Result<PathBuf> {
        fs::create_dir_all(&self.target)?;

        let downloader = Downloader::new(self.endpoints.clone())?;
        let archive = downloader.download_embeddable(&self.version, &self.cache_dir)?;
        extract_archive(&archive, &self.target)?;
        println!("Create python env in {} done!", self.target.display());

        let version_tag = self.query_version_tag()?;
        tracing::debug!("version tag: {}", version_tag);

        downloader.download_get_pip(&self.target)?;
        self.bootstrap_pip()?;
        println!("pip install done!");

        append_import_site(&self.target, &version_tag)?;
        println!("Add {}._pth done!", version_tag);

        write_project_path_pth(&self.target)?;
        println!("Add {} done!", PROJECT_PATH_PTH);

        Ok(self.interpreter())
    }

    /// Run `python -V` and derive the version tag from its first line.
    fn query_version_tag(&self) -> Result<String> {
        let interpreter = self.interpreter();
        tracing::debug!("Executing: {} -V", interpreter.display());

        let output = Command::new(&interpreter).arg("-V").output()?;

        // Interpreters before 3.4 report the version on stderr.
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        let reported = if stdout.trim().is_empty() {
            stderr
        } else {
            stdout
        };

        let line = reported.lines().next().unwrap_or_default();
        Ok(version_tag(line))
    }

    /// Run the downloaded bootstrap script with the extracted interpreter.
    fn bootstrap_pip(&self) -> Result<()> {
        let interpreter = self.interpreter();
        let script = self.target.join(GET_PIP_FILE_NAME);
        tracing::debug!(
            "Executing: {} {}",
            interpreter.display(),
            script.display()
        );

        let status = Command::new(&interpreter)
            .arg(&script)
            .status()
            .map_err(|e| EmbedError::Bootstrap(e.to_string()))?;

        if !status.success() {
            return Err(EmbedError::Bootstrap(format!(
                "Command '{} {}' returned {}",
                interpreter.display(),
                script.display(),
                status
            )));
        }

        Ok(())
    }
}

/// Derive the `._pth` version tag from an interpreter's `-V` output line.
///
/// Dots become spaces, the line is split on single spaces and the first
/// three pieces are joined and lowercased: `Python 3.10.4` gives `python310`.
/// `line` is expected without its line terminator, so a two-part version
/// such as `Python 3.8` gives `python38` rather than carrying a newline.
pub fn version_tag(line: &str) -> String {
    line.replace('.', " ")
        .split(' ')
        .take(3)
        .collect::<String>()
        .to_lowercase()
}

/// Extract every entry of the zip at `archive` into `dest`.
pub fn extract_archive(archive: &Path, dest: &Path) -> Result<()> {
    let file = File::open(archive)?;
    let mut zip = ZipArchive::new(file)?;
    zip.extract(dest)?;
    Ok(())
}

/// Append `import site` to `{dir}/{version_tag}._pth`, creating it if needed.
///
/// No newline is written before or after the line.
pub fn append_import_site(dir: &Path, version_tag: &str) -> Result<PathBuf> {
    let path = dir.join(format!("{version_tag}._pth"));
    let mut file = OpenOptions::new().create(true).append(true).open(&path)?;
    file.write_all(IMPORT_SITE.as_bytes())?;
    Ok(path)
}

/// Write `Lib/site-packages/project_path.pth` under `dir`, replacing any existing file.
pub fn write_project_path_pth(dir: &Path) -> Result<PathBuf> {
    let site_packages = dir.join("Lib").join("site-packages");
    fs::create_dir_all(&site_packages)?;

    let path = site_packages.join(PROJECT_PATH_PTH);
    fs::write(&path, PROJECT_PATH_DIRECTIVE)?;
    Ok(path)
}
