//! External command execution utilities.
//!
//! Provides a builder-based API for running the site build command. Output is
//! inherited so the generator's own progress and diagnostics reach the
//! terminal unchanged.
//!
//! # Examples
//!
//! ```ignore
//! use crate::utils::exec::Cmd;
//!
//! Cmd::from_slice(&["mkdocs", "build", "--dirty"])
//!     .cwd(root)
//!     .envs([("DOCSERVE_ROOT", "/srv/site")])
//!     .run()?;
//! ```

use anyhow::{Context, Result, bail};
use std::{
    ffi::{OsStr, OsString},
    path::{Path, PathBuf},
    process::Command,
};

/// Command builder for external process execution.
#[derive(Debug, Clone, Default)]
pub struct Cmd {
    program: OsString,
    args: Vec<OsString>,
    cwd: Option<PathBuf>,
    envs: Vec<(String, String)>,
}

impl Cmd {
    /// Create a new command builder.
    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            ..Default::default()
        }
    }

    /// Create from a command array (e.g., `["make"]` or `["mkdocs", "build"]`).
    pub fn from_slice<S: AsRef<OsStr>>(cmd: &[S]) -> Self {
        let mut iter = cmd.iter();
        let program = iter
            .next()
            .map(|s| s.as_ref().to_owned())
            .unwrap_or_default();
        let args: Vec<_> = iter.map(|s| s.as_ref().to_owned()).collect();
        Self {
            program,
            args,
            ..Default::default()
        }
    }

    /// Add a single argument.
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        let arg = arg.as_ref();
        if !arg.is_empty() {
            self.args.push(arg.to_owned());
        }
        self
    }

    /// Set working directory.
    pub fn cwd<P: AsRef<Path>>(mut self, dir: P) -> Self {
        self.cwd = Some(dir.as_ref().to_owned());
        self
    }

    /// Set environment variables for the subprocess.
    pub fn envs<K, V, I>(mut self, vars: I) -> Self
    where
        K: AsRef<str>,
        V: AsRef<str>,
        I: IntoIterator<Item = (K, V)>,
    {
        for (k, v) in vars {
            self.envs.push((k.as_ref().to_owned(), v.as_ref().to_owned()));
        }
        self
    }

    /// Get the program name for error messages.
    pub fn program_name(&self) -> String {
        self.program.to_string_lossy().to_string()
    }

    /// Human-readable command line, for logs.
    pub fn display(&self) -> String {
        std::iter::once(&self.program)
            .chain(&self.args)
            .map(|s| s.to_string_lossy())
            .collect::<Vec<_>>()
            .join(" ")
    }

    /// Resolve the program on `PATH` (or relative to the working directory).
    pub fn resolve_program(&self) -> Result<PathBuf> {
        let name = self.program_name();
        if name.is_empty() {
            bail!("empty command");
        }
        let resolved = match &self.cwd {
            Some(dir) => which::which_in(&self.program, std::env::var_os("PATH"), dir),
            None => which::which(&self.program),
        };
        resolved.with_context(|| format!("`{name}` not found"))
    }

    /// Execute the command with inherited stdio, failing on non-zero exit.
    pub fn run(&self) -> Result<()> {
        let name = self.program_name();
        let program = self.resolve_program()?;

        let mut cmd = Command::new(program);
        cmd.args(&self.args).envs(self.envs.iter().cloned());

        if let Some(dir) = &self.cwd {
            cmd.current_dir(dir);
        }

        let status = cmd
            .status()
            .with_context(|| format!("Failed to execute `{name}`"))?;

        if !status.success() {
            match status.code() {
                Some(code) => bail!("`{}` exited with status {code}", self.display()),
                None => bail!("`{}` was terminated by a signal", self.display()),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_from_slice_splits_program_and_args() {
        let cmd = Cmd::from_slice(&["mkdocs", "build", "--dirty"]);
        assert_eq!(cmd.program_name(), "mkdocs");
        assert_eq!(cmd.display(), "mkdocs build --dirty");
    }

    #[test]
    fn test_empty_args_are_skipped() {
        let cmd = Cmd::new("make").arg("").arg("html");
        assert_eq!(cmd.display(), "make html");
    }

    #[test]
    fn test_empty_command_fails_to_resolve() {
        let cmd = Cmd::from_slice::<&str>(&[]);
        assert!(cmd.resolve_program().is_err());
    }

    #[test]
    fn test_missing_program_reports_name() {
        let err = Cmd::new("docserve-no-such-program-xyz").run().unwrap_err();
        assert!(format!("{err:#}").contains("docserve-no-such-program-xyz"));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_success_and_failure() {
        assert!(Cmd::from_slice(&["true"]).run().is_ok());

        let err = Cmd::from_slice(&["false"]).run().unwrap_err();
        assert!(err.to_string().contains("exited with status 1"));
    }

    #[cfg(unix)]
    #[test]
    fn test_run_in_cwd_with_env() {
        let temp = tempfile::TempDir::new().unwrap();
        Cmd::from_slice(&["sh", "-c", "printf %s \"$DOCSERVE_GREETING\" > greeting.txt"])
            .cwd(temp.path())
            .envs([("DOCSERVE_GREETING", "hello")])
            .run()
            .unwrap();

        let written = std::fs::read_to_string(temp.path().join("greeting.txt")).unwrap();
        assert_eq!(written, "hello");
    }
}
