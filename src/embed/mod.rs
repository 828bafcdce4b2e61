//! Embeddable Python distribution handling.
//!
//! An environment is assembled from the official Windows embeddable zip:
//! the archive is downloaded and extracted, pip is bootstrapped with
//! `get-pip.py`, and the path configuration files are patched so that
//! site-packages and the running script's directory are importable.

mod builder;
mod download;

pub use builder::{
    append_import_site, extract_archive, version_tag, write_project_path_pth, EmbedEnvBuilder,
    IMPORT_SITE, INTERPRETER_NAME, PROJECT_PATH_DIRECTIVE, PROJECT_PATH_PTH,
};
pub use download::{Downloader, DEFAULT_CACHE_DIR, GET_PIP_FILE_NAME};
