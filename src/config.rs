use std::{path::Path, time::Duration};

use anyhow::{Context, Result};

pub const DEFAULT_EDITOR: &str = "vi";
pub const PAGER: &str = "less";
pub const PAGER_ARGS: &[&str] = &["-R"];

/// A program plus leading arguments, e.g. `code --wait`.
#[derive(Debug, Clone, PartialEq)]
pub struct CommandLine {
    pub program: String,
    pub args: Vec<String>,
}

impl CommandLine {
    /// Splits a shell-style command line.
    pub fn parse(line: &str) -> Result<Self> {
        let mut words = shlex::split(line)
            .filter(|words| !words.is_empty())
            .with_context(|| format!("Invalid command line: '{}'", line))?;
        let program = words.remove(0);
        Ok(Self {
            program,
            args: words,
        })
    }

    /// Arguments with `file` appended.
    pub fn args_with(&self, file: &Path) -> Vec<String> {
        let mut args = self.args.clone();
        args.push(file.display().to_string());
        args
    }
}

/// Settings taken from the environment.
#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub editor: CommandLine,
    pub pager: CommandLine,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let editor = lookup("EDITOR")
            .filter(|value| !value.trim().is_empty())
            .unwrap_or_else(|| DEFAULT_EDITOR.to_string());

        Ok(Self {
            editor: CommandLine::parse(&editor).context("Invalid $EDITOR")?,
            pager: CommandLine {
                program: PAGER.to_string(),
                args: PAGER_ARGS.iter().map(|arg| arg.to_string()).collect(),
            },
        })
    }
}

/// Parses a duration such as `30s`, `5m` or `2h`; a unitless number is
/// taken as seconds.
pub fn parse_duration(value: &str) -> Result<Duration> {
    let value = value.trim();

    if let Ok(seconds) = value.parse::<u64>() {
        return Ok(Duration::from_secs(seconds));
    }

    let (number, scale) = if let Some(n) = value.strip_suffix('s') {
        (n, 1)
    } else if let Some(n) = value.strip_suffix('m') {
        (n, 60)
    } else if let Some(n) = value.strip_suffix('h') {
        (n, 3600)
    } else {
        anyhow::bail!(
            "Invalid duration '{}'. Supported formats: unitless number (seconds), '30s', '5m', '2h'",
            value
        );
    };

    let number: u64 = number
        .parse()
        .with_context(|| format!("Invalid duration: '{}'", value))?;
    let seconds = number
        .checked_mul(scale)
        .with_context(|| format!("Invalid duration: '{}' is too large", value))?;
    Ok(Duration::from_secs(seconds))
}
