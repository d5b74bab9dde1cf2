use std::fmt::{Display, Formatter};
use std::path::{Path, PathBuf};
use std::str::FromStr;

use thiserror::Error;

/// A file that something is read from, e.g. a plan.
///
/// Relative paths are kept relative, they are resolved against the working directory when opened.
#[derive(
    Debug,
    serde::Serialize,
    serde::Deserialize,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash
)]
pub struct FileSource(PathBuf);

impl FileSource {
    pub fn try_from_path(path: PathBuf) -> Result<Self, SourceError> {
        if !path.exists() {
            return Err(SourceError::PathDoesNotExist(path));
        }
        if !path.is_file() {
            return Err(SourceError::PathIsNotAFile(path));
        }
        Ok(Self(path))
    }

    pub fn path(&self) -> &Path {
        &self.0
    }
}

impl FromStr for FileSource {
    type Err = SourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.trim().is_empty() {
            return Err(SourceError::Empty);
        }
        Ok(Self(PathBuf::from(s)))
    }
}

impl Display for FileSource {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.0.display().to_string().as_str())
    }
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("Path does not exist. path: {0:?}")]
    PathDoesNotExist(PathBuf),
    #[error("Path is not a file. path: {0:?}")]
    PathIsNotAFile(PathBuf),
    #[error("Empty source.")]
    Empty,
}
