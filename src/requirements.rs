//! `requirements.txt` reader.

use crate::error::Result;
use std::fs;
use std::path::Path;

/// File name read from the project directory.
pub const REQUIREMENTS_FILE_NAME: &str = "requirements.txt";

/// Read the requirement specifiers of the project in `project_dir`.
///
/// Every line is trimmed and kept in file order. Blank lines are kept as
/// empty strings.
pub fn read_requirements(project_dir: &Path) -> Result<Vec<String>> {
    let content = fs::read_to_string(project_dir.join(REQUIREMENTS_FILE_NAME))?;
    Ok(parse_requirements(&content))
}

/// Split requirement file content into trimmed lines.
pub fn parse_requirements(content: &str) -> Vec<String> {
    content.lines().map(|line| line.trim().to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::EmbedError;
    use tempfile::TempDir;

    #[test]
    fn test_read_keeps_blank_lines() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(REQUIREMENTS_FILE_NAME),
            "numpy==1.2.3\n\nrequests\n",
        )
        .unwrap();

        let requirements = read_requirements(temp.path()).unwrap();
        assert_eq!(requirements, vec!["numpy==1.2.3", "", "requests"]);
    }

    #[test]
    fn test_trims_whitespace() {
        let requirements = parse_requirements("  flask>=2.0  \r\n\tpandas\n");
        assert_eq!(requirements, vec!["flask>=2.0", "pandas"]);
    }

    #[test]
    fn test_no_trailing_newline() {
        assert_eq!(parse_requirements("a\nb"), vec!["a", "b"]);
    }

    #[test]
    fn test_missing_file() {
        let temp = TempDir::new().unwrap();
        let err = read_requirements(temp.path()).unwrap_err();
        match err {
            EmbedError::Io(e) => assert_eq!(e.kind(), std::io::ErrorKind::NotFound),
            other => panic!("unexpected error: {other}"),
        }
    }
}
