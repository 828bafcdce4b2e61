//! embedpy CLI entry point.

use clap::{ArgAction, CommandFactory, Parser};
use clap_complete::{generate, Shell};
use embedpy::commands::provision;
use embedpy::config::{
    Endpoints, DEFAULT_GET_PIP_URL, DEFAULT_PYTHON_MIRROR, DEFAULT_TORCH_INDEX_URL,
};
use embedpy::embed::DEFAULT_CACHE_DIR;
use embedpy::error::Result;
use std::ffi::OsString;
use std::io;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "embedpy")]
#[command(about = "Provision an embeddable Python environment and install project requirements")]
#[command(author)]
struct Cli {
    /// Python interpreter path (or project name with --from-config)
    #[arg(short, long, required_unless_present_any = ["new_env", "completions"])]
    project: Option<String>,

    /// Project directory containing requirements.txt
    #[arg(short, long, required_unless_present = "completions")]
    dir: Option<PathBuf>,

    /// Create a new embeddable environment in this directory
    #[arg(long = "new_env", visible_alias = "new", requires = "version")]
    new_env: Option<PathBuf>,

    /// Python version of the new environment (e.g. 3.10.4)
    #[arg(short, long)]
    version: Option<String>,

    /// Install torch, torchvision and torchaudio (CUDA) before the requirements
    #[arg(long)]
    torch: bool,

    /// Resolve --project as a project name through config.ini
    #[arg(long)]
    from_config: bool,

    /// Directory downloaded archives are cached in
    #[arg(long, default_value = DEFAULT_CACHE_DIR)]
    cache_dir: PathBuf,

    /// Base URL of the embeddable distribution tree
    #[arg(long, env = "EMBEDPY_PYTHON_MIRROR", default_value = DEFAULT_PYTHON_MIRROR)]
    python_mirror: String,

    /// URL of the pip bootstrap script
    #[arg(long, env = "EMBEDPY_GET_PIP_URL", default_value = DEFAULT_GET_PIP_URL)]
    get_pip_url: String,

    /// Package index for the torch suite
    #[arg(long, env = "EMBEDPY_TORCH_INDEX_URL", default_value = DEFAULT_TORCH_INDEX_URL)]
    torch_index_url: String,

    /// Verbosity level (--verbose, repeat for more)
    #[arg(long, action = ArgAction::Count)]
    verbose: u8,

    /// Print shell completions and exit
    #[arg(long, value_enum, value_name = "SHELL")]
    completions: Option<Shell>,
}

fn main() {
    if let Err(e) = run_cli() {
        eprintln!("error: {}", e);
        std::process::exit(1);
    }
}

fn run_cli() -> Result<()> {
    let cli = Cli::parse_from(normalize_legacy_flags(std::env::args_os()));
    init_tracing(cli.verbose);

    if let Some(shell) = cli.completions {
        let mut cmd = Cli::command();
        generate(shell, &mut cmd, "embedpy", &mut io::stdout());
        return Ok(());
    }

    provision::execute(provision::ProvisionArgs {
        project: cli.project,
        from_config: cli.from_config,
        dir: cli.dir.unwrap_or_default(),
        new_env: cli.new_env,
        version: cli.version,
        torch: cli.torch,
        cache_dir: cli.cache_dir,
        endpoints: Endpoints {
            python_mirror: cli.python_mirror,
            get_pip_url: cli.get_pip_url,
            torch_index_url: cli.torch_index_url,
        },
    })
}

/// Rewrite the single-dash long spellings `-new` and `-torch`.
fn normalize_legacy_flags(args: impl IntoIterator<Item = OsString>) -> Vec<OsString> {
    args.into_iter()
        .map(|arg| match arg.to_str() {
            Some("-new") => OsString::from("--new_env"),
            Some("-torch") => OsString::from("--torch"),
            _ => arg,
        })
        .collect()
}

fn init_tracing(verbosity: u8) {
    let level = match verbosity {
        0 => "warn",
        1 => "info",
        2 => "debug",
        _ => "trace",
    };

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("warn,embedpy={level}")));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .with_target(false)
        .init();
}
