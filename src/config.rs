//! Configuration handling for embedpy.
//!
//! Two sources feed a run: `config.ini`, which maps project names to
//! interpreter paths, and [`Endpoints`], the remote locations the
//! environment is assembled from.

use crate::error::{ConfigErrorKind, EmbedError, Result};
use ini::{Ini, ParseOption};
use std::path::Path;

/// The project configuration file name, resolved against the working directory.
pub const CONFIG_FILE_NAME: &str = "config.ini";

/// Key holding the interpreter path inside a project section.
pub const PY_ENV_KEY: &str = "py_env";

/// Section whose values apply to every other section.
const DEFAULT_SECTION: &str = "DEFAULT";

pub const DEFAULT_PYTHON_MIRROR: &str = "https://www.python.org/ftp/python";
pub const DEFAULT_GET_PIP_URL: &str = "https://bootstrap.pypa.io/get-pip.py";
pub const DEFAULT_TORCH_INDEX_URL: &str = "https://download.pytorch.org/whl/cu118";

/// Project name to interpreter mapping loaded from `config.ini`.
#[derive(Debug)]
pub struct ProjectConfig {
    ini: Ini,
}

impl ProjectConfig {
    /// Load a configuration file.
    pub fn load(path: &Path) -> Result<Self> {
        match Ini::load_from_file_opt(path, parse_option()) {
            Ok(ini) => Ok(Self { ini }),
            Err(ini::Error::Io(e)) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!("{} does not exist", path.display());
                Err(EmbedError::Config(ConfigErrorKind::NotFound))
            }
            Err(e) => {
                tracing::debug!("failed to parse {}: {}", path.display(), e);
                Err(EmbedError::Config(ConfigErrorKind::Parse))
            }
        }
    }

    /// Load `config.ini` from the current directory.
    pub fn load_from_cwd() -> Result<Self> {
        Self::load(Path::new(CONFIG_FILE_NAME))
    }

    /// Parse configuration from an ini string.
    pub fn from_ini_str(content: &str) -> Result<Self> {
        let ini = Ini::load_from_str_opt(content, parse_option()).map_err(|e| {
            tracing::debug!("failed to parse config: {}", e);
            EmbedError::Config(ConfigErrorKind::Parse)
        })?;
        Ok(Self { ini })
    }

    /// Interpreter path configured for `project`.
    ///
    /// The section must exist. The key is matched case-insensitively and
    /// falls back to `[DEFAULT]`.
    pub fn python_env(&self, project: &str) -> Result<String> {
        let section = self
            .ini
            .section(Some(project))
            .ok_or(EmbedError::Config(ConfigErrorKind::NotFound))?;

        let value = lookup_key(section, PY_ENV_KEY)
            .or_else(|| {
                self.ini
                    .section(Some(DEFAULT_SECTION))
                    .and_then(|defaults| lookup_key(defaults, PY_ENV_KEY))
            })
            .ok_or(EmbedError::Config(ConfigErrorKind::NotFound))?;

        let value = value.trim();
        if value.is_empty() {
            return Err(EmbedError::Config(ConfigErrorKind::Empty));
        }

        Ok(value.to_string())
    }
}

/// Values are taken verbatim so Windows paths keep their backslashes.
fn parse_option() -> ParseOption {
    ParseOption {
        enabled_quote: false,
        enabled_escape: false,
        ..ParseOption::default()
    }
}

fn lookup_key<'a>(section: &'a ini::Properties, key: &str) -> Option<&'a str> {
    section
        .iter()
        .find(|(k, _)| k.eq_ignore_ascii_case(key))
        .map(|(_, v)| v)
}

/// Look up the interpreter path for `project` in `./config.ini`.
pub fn python_env_for(project: &str) -> Result<String> {
    ProjectConfig::load_from_cwd()?.python_env(project)
}

/// Remote locations used while building an environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Endpoints {
    /// Base of the versioned embeddable distribution tree.
    pub python_mirror: String,
    /// Location of the pip bootstrap script.
    pub get_pip_url: String,
    /// Package index serving CUDA builds of the torch suite.
    pub torch_index_url: String,
}

impl Default for Endpoints {
    fn default() -> Self {
        Self {
            python_mirror: DEFAULT_PYTHON_MIRROR.to_string(),
            get_pip_url: DEFAULT_GET_PIP_URL.to_string(),
            torch_index_url: DEFAULT_TORCH_INDEX_URL.to_string(),
        }
    }
}

impl Endpoints {
    /// URL of the embeddable archive for `version`.
    pub fn embeddable_url(&self, version: &str) -> String {
        format!(
            "{}/{}/{}",
            self.python_mirror.trim_end_matches('/'),
            version,
            embeddable_file_name(version)
        )
    }
}

/// File name of the amd64 embeddable archive for `version`.
pub fn embeddable_file_name(version: &str) -> String {
    format!("python-{version}-embed-amd64.zip")
}
