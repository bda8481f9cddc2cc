use std::{
    fs,
    path::{Path, PathBuf},
};

use log::{info, warn};

use crate::{
    error::CloudgenError,
    formatter::{Formatter, Formatters},
};

/// Consumer an artifact is generated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Target {
    Firmware,
    Host,
}

/// Decides which style pass runs after writing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Style {
    C,
    Python,
    Plain,
}

/// One rendered file, relative to the output directory of its target.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    pub target:   Target,
    pub path:     PathBuf,
    pub style:    Style,
    pub contents: String,
}

impl Artifact {
    pub fn new(target: Target, path: impl Into<PathBuf>, style: Style, contents: String) -> Self {
        Artifact { target, path: path.into(), style, contents }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutputLayout {
    pub firmware: PathBuf,
    pub host:     PathBuf,
}

impl OutputLayout {
    pub fn resolve(&self, artifact: &Artifact) -> PathBuf {
        let root = match artifact.target {
            Target::Firmware => &self.firmware,
            Target::Host     => &self.host,
        };
        root.join(&artifact.path)
    }
}

fn formatter_for<'a>(formatters: &'a Formatters, style: Style) -> Option<&'a dyn Formatter> {
    match style {
        Style::C      => Some(formatters.c.as_ref()),
        Style::Python => Some(formatters.python.as_ref()),
        Style::Plain  => None,
    }
}

/// Write every artifact in one pass each, then run its style pass.
/// Formatter failures are logged and otherwise ignored.
pub fn write_artifacts(
    artifacts:  &[Artifact],
    layout:     &OutputLayout,
    formatters: &Formatters,
) -> Result<Vec<PathBuf>, CloudgenError> {
    let mut written = Vec::with_capacity(artifacts.len());

    for artifact in artifacts {
        let path = layout.resolve(artifact);
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, &artifact.contents)?;
        info!("wrote {}", path.display());

        if let Some(formatter) = formatter_for(formatters, artifact.style) {
            format_file(formatter, &path);
        }
        written.push(path);
    }
    Ok(written)
}

fn format_file(formatter: &dyn Formatter, path: &Path) {
    if let Err(err) = formatter.format(path) {
        warn!("{}", err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::formatter::ClangFormat;

    #[test]
    fn test_write_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout {
            firmware: dir.path().join("fw"),
            host:     dir.path().join("host"),
        };
        let artifacts = vec![
            Artifact::new(Target::Firmware, "include/infuse/a.h", Style::C, "int a;\n".into()),
            Artifact::new(Target::Host, "a.py", Style::Plain, "a = 1\n".into()),
        ];

        let written = write_artifacts(&artifacts, &layout, &Formatters::none()).unwrap();
        assert_eq!(written[0], dir.path().join("fw/include/infuse/a.h"));
        assert_eq!(fs::read_to_string(&written[0]).unwrap(), "int a;\n");
        assert_eq!(fs::read_to_string(&written[1]).unwrap(), "a = 1\n");
    }

    #[test]
    fn test_formatter_failure_is_not_fatal() {
        let dir = tempfile::tempdir().unwrap();
        let layout = OutputLayout {
            firmware: dir.path().to_path_buf(),
            host:     dir.path().to_path_buf(),
        };
        let formatters = Formatters {
            c: Box::new(ClangFormat {
                binary:     PathBuf::from("/nonexistent/clang-format-for-tests"),
                style_file: None,
            }),
            python: Box::new(crate::formatter::NoFormat),
        };
        let artifacts = vec![Artifact::new(Target::Firmware, "x.h", Style::C, "int x;\n".into())];

        let written = write_artifacts(&artifacts, &layout, &formatters).unwrap();
        assert_eq!(fs::read_to_string(&written[0]).unwrap(), "int x;\n");
    }
}
