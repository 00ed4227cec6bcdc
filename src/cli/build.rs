//! `docserve build`: run the configured build command once.
//!
//! Also adapts that command into a [`Builder`] for the serve loop.

use std::time::Instant;

use anyhow::{Result, bail};

use crate::config::Config;
use crate::scheduler::Builder;
use crate::log;
use crate::utils::exec::Cmd;

/// Environment variable carrying the served root to the build command.
pub const ROOT_ENV: &str = "DOCSERVE_ROOT";

/// The configured build command, run from the project directory.
pub fn build_command(config: &Config) -> Option<Cmd> {
    if config.serve.build.is_empty() {
        return None;
    }
    let root = config.serve.root.to_string_lossy().into_owned();
    Some(
        Cmd::from_slice(config.serve.build.as_slice())
            .cwd(&config.base)
            .envs([(ROOT_ENV, root)]),
    )
}

/// Wrap a command as a rebuild callback named after its program.
pub fn command_builder(cmd: Cmd) -> Builder {
    Builder::named(cmd.program_name(), move || cmd.run())
}

/// Run `cmd` once in the foreground, logging how long it took.
pub fn run_once(cmd: &Cmd) -> Result<()> {
    log!("build"; "running `{}`", cmd.display());
    let start = Instant::now();
    cmd.run()?;
    log!("build"; "done in {}ms", start.elapsed().as_millis());
    Ok(())
}

pub fn run_build(config: &Config) -> Result<()> {
    let Some(cmd) = build_command(config) else {
        bail!("no build command configured (set `serve.build` or pass --build)");
    };
    run_once(&cmd)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    fn config(build: &[&str], base: PathBuf) -> Config {
        let mut config = Config {
            base,
            ..Default::default()
        };
        config.serve.build = build.iter().map(|s| s.to_string()).collect();
        config.serve.root = PathBuf::from("/srv/site");
        config
    }

    #[test]
    fn test_no_command_configured() {
        let config = config(&[], PathBuf::from("/"));
        assert!(build_command(&config).is_none());

        let err = run_build(&config).unwrap_err();
        assert!(err.to_string().contains("no build command"));
    }

    #[test]
    fn test_builder_named_after_program() {
        let config = config(&["mkdocs", "build"], PathBuf::from("/"));
        let cmd = build_command(&config).unwrap();
        assert_eq!(cmd.display(), "mkdocs build");
        assert_eq!(command_builder(cmd).name(), "mkdocs");
    }

    #[cfg(unix)]
    #[test]
    fn test_command_runs_in_base_with_root_env() {
        let temp = tempfile::TempDir::new().unwrap();
        let config = config(
            &["sh", "-c", "printf %s \"$DOCSERVE_ROOT\" > root.txt"],
            temp.path().to_path_buf(),
        );

        run_build(&config).unwrap();

        let written = std::fs::read_to_string(temp.path().join("root.txt")).unwrap();
        assert_eq!(written, "/srv/site");
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_command_errors_through_builder() {
        let config = config(&["false"], PathBuf::from("/"));
        let builder = command_builder(build_command(&config).unwrap());
        assert!(builder.run().is_err());
    }
}
