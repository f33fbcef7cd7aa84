use std::ffi::OsString;
use std::path::PathBuf;

use anyhow::{bail, Result};

pub const USAGE: &str = "usage: prism-studio [--output-only] [SKYBOX_IMAGE]";

/// Which compute program the studio runs.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Program {
    /// Ray tracer with camera + skybox bindings.
    Trace,
    /// UV test pattern; binds only the output image.
    OutputOnly,
}

#[derive(Debug, Clone, PartialEq)]
pub struct StudioConfig {
    pub program: Program,
    /// Equirectangular sky image; a procedural sky is used when absent.
    pub skybox: Option<PathBuf>,
    pub title: String,
    pub width: f64,
    pub height: f64,
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            program: Program::Trace,
            skybox: None,
            title: "Prism Studio".to_string(),
            width: 1280.0,
            height: 720.0,
        }
    }
}

/// Outcome of argument parsing.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Run(StudioConfig),
    Help,
}

/// Parses the arguments after the program name.
pub fn parse_args<I>(args: I) -> Result<Command>
where
    I: IntoIterator<Item = OsString>,
{
    let mut config = StudioConfig::default();

    for arg in args {
        match arg.to_str() {
            Some("-h" | "--help") => return Ok(Command::Help),
            Some("--output-only") => config.program = Program::OutputOnly,
            Some(flag) if flag.starts_with('-') => bail!("unknown option '{flag}'\n{USAGE}"),
            _ => {
                if config.skybox.is_some() {
                    bail!("more than one skybox given\n{USAGE}");
                }
                config.skybox = Some(PathBuf::from(&arg));
            }
        }
    }

    Ok(Command::Run(config))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(args: &[&str]) -> Result<Command> {
        parse_args(args.iter().map(OsString::from))
    }

    #[test]
    fn no_args_runs_tracer_with_procedural_sky() {
        assert_eq!(parse(&[]).unwrap(), Command::Run(StudioConfig::default()));
    }

    #[test]
    fn positional_is_skybox() {
        let Command::Run(cfg) = parse(&["sky.hdr"]).unwrap() else { panic!("expected run") };
        assert_eq!(cfg.skybox, Some(PathBuf::from("sky.hdr")));
        assert_eq!(cfg.program, Program::Trace);
    }

    #[test]
    fn output_only_flag() {
        let Command::Run(cfg) = parse(&["--output-only"]).unwrap() else { panic!("expected run") };
        assert_eq!(cfg.program, Program::OutputOnly);
    }

    #[test]
    fn help_and_errors() {
        assert_eq!(parse(&["--help"]).unwrap(), Command::Help);
        assert!(parse(&["--bogus"]).is_err());
        assert!(parse(&["a.png", "b.png"]).is_err());
    }
}
