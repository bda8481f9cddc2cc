//! External code style pass over written artifacts.

use std::{
    path::{Path, PathBuf},
    process::Command,
};

use crate::error::FormatError;

pub trait Formatter {
    /// Tool name used in log messages.
    fn name(&self) -> &str;

    /// Rewrite `path` in place.
    fn format(&self, path: &Path) -> Result<(), FormatError>;
}

fn run(tool: &str, mut command: Command, path: &Path) -> Result<(), FormatError> {
    let status = command.status().map_err(|source| FormatError::Spawn {
        tool: tool.to_string(),
        source,
    })?;
    if !status.success() {
        return Err(FormatError::Status {
            tool: tool.to_string(),
            status,
            path: path.to_path_buf(),
        });
    }
    Ok(())
}

/// `clang-format -i`, optionally against an explicit `.clang-format` file.
pub struct ClangFormat {
    pub binary:     PathBuf,
    pub style_file: Option<PathBuf>,
}

impl Formatter for ClangFormat {
    fn name(&self) -> &str {
        "clang-format"
    }

    fn format(&self, path: &Path) -> Result<(), FormatError> {
        let mut command = Command::new(&self.binary);
        if let Some(style) = &self.style_file {
            command.arg(format!("--style=file:{}", style.display()));
        }
        command.arg("-i").arg(path);
        run(self.name(), command, path)
    }
}

/// `ruff format`.
pub struct RuffFormat {
    pub binary: PathBuf,
}

impl Formatter for RuffFormat {
    fn name(&self) -> &str {
        "ruff"
    }

    fn format(&self, path: &Path) -> Result<(), FormatError> {
        let mut command = Command::new(&self.binary);
        command.arg("format").arg("--quiet").arg(path);
        run(self.name(), command, path)
    }
}

pub struct NoFormat;

impl Formatter for NoFormat {
    fn name(&self) -> &str {
        "none"
    }

    fn format(&self, _path: &Path) -> Result<(), FormatError> {
        Ok(())
    }
}

/// Formatter per artifact style.
pub struct Formatters {
    pub c:      Box<dyn Formatter>,
    pub python: Box<dyn Formatter>,
}

impl Formatters {
    pub fn none() -> Self {
        Formatters {
            c:      Box::new(NoFormat),
            python: Box::new(NoFormat),
        }
    }
}
