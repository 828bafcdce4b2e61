//! Provisioning flow: optional environment creation, then requirement installs.

use crate::config::{self, Endpoints};
use crate::embed::EmbedEnvBuilder;
use crate::error::Result;
use crate::pip::PipInstaller;
use crate::requirements::read_requirements;
use std::path::PathBuf;

/// Arguments for a provisioning run.
pub struct ProvisionArgs {
    /// Interpreter path, or project name when `from_config` is set
    pub project: Option<String>,
    /// Resolve `project` through config.ini
    pub from_config: bool,
    /// Directory holding requirements.txt
    pub dir: PathBuf,
    /// Target directory of a new environment
    pub new_env: Option<PathBuf>,
    /// Python version for the new environment
    pub version: Option<String>,
    /// Install the CUDA torch suite first
    pub torch: bool,
    /// Archive cache directory
    pub cache_dir: PathBuf,
    pub endpoints: Endpoints,
}

/// Execute a provisioning run.
pub fn execute(args: ProvisionArgs) -> Result<()> {
    let created = match args.new_env {
        Some(ref target) => {
            let version = args.version.clone().unwrap_or_default();
            let builder = EmbedEnvBuilder::new(target.clone(), version)
                .cache_dir(args.cache_dir.clone())
                .endpoints(args.endpoints.clone());
            Some(builder.build()?)
        }
        None => {
            println!("No need to create new env.");
            None
        }
    };

    let python = resolve_interpreter(created, args.project.as_deref(), args.from_config)?;
    tracing::info!("installing with {}", python.display());

    let requirements = read_requirements(&args.dir)?;
    let installer = PipInstaller::new(&python);

    if args.torch {
        installer.install_torch_suite(&args.endpoints.torch_index_url)?;
    }

    installer.install_all(&requirements)
}

/// Pick the interpreter: a freshly created one wins, then `project`.
///
/// `project` is taken literally unless `from_config` asks for a
/// `config.ini` lookup.
fn resolve_interpreter(
    created: Option<PathBuf>,
    project: Option<&str>,
    from_config: bool,
) -> Result<PathBuf> {
    if let Some(python) = created {
        return Ok(python);
    }

    let project = project.unwrap_or_default();
    if from_config {
        return config::python_env_for(project).map(PathBuf::from);
    }

    Ok(PathBuf::from(project))
}
