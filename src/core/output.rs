//! Execution context for a command invocation.
//!
//! Carries the working directory and the output streams so commands never
//! reach for process globals directly.

use colored::Colorize;
use std::fmt;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

pub struct Context<'a> {
    pub dir: PathBuf,
    pub stdout: &'a mut dyn Write,
    pub stderr: &'a mut dyn Write,
}

impl<'a> Context<'a> {
    pub fn new(dir: PathBuf, stdout: &'a mut dyn Write, stderr: &'a mut dyn Write) -> Self {
        Self {
            dir,
            stdout,
            stderr,
        }
    }

    /// Context rooted at the process working directory.
    pub fn from_env(stdout: &'a mut dyn Write, stderr: &'a mut dyn Write) -> io::Result<Self> {
        let dir = std::env::current_dir()?;
        Ok(Self::new(dir, stdout, stderr))
    }

    /// Resolves `path` against the context directory.
    pub fn abs_path(&self, path: &Path) -> PathBuf {
        if path.is_absolute() {
            path.to_path_buf()
        } else {
            self.dir.join(path)
        }
    }

    /// Writes an informational line to stderr. Write failures are ignored.
    pub fn infof(&mut self, args: fmt::Arguments<'_>) {
        let _ = writeln!(self.stderr, "{}", args);
    }

    /// Writes `error: <err>` to stderr.
    pub fn write_error(&mut self, err: &dyn fmt::Display) {
        let _ = writeln!(self.stderr, "{} {}", "error:".bright_red().bold(), err);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_abs_path_joins_relative_paths() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        let ctx = Context::new(PathBuf::from("/work"), &mut out, &mut err);
        assert_eq!(ctx.abs_path(Path::new("data")), PathBuf::from("/work/data"));
        assert_eq!(
            ctx.abs_path(Path::new("/var/lib/juju")),
            PathBuf::from("/var/lib/juju")
        );
    }

    #[test]
    fn test_infof_writes_line_to_stderr() {
        let mut out = Vec::new();
        let mut err = Vec::new();
        {
            let mut ctx = Context::new(PathBuf::from("/"), &mut out, &mut err);
            ctx.infof(format_args!("\nStep {}: {}", 1, "do things"));
        }
        assert!(out.is_empty());
        assert_eq!(String::from_utf8(err).unwrap(), "\nStep 1: do things\n");
    }
}
