//! Line-oriented control surface used by `--interactive`.

use std::path::PathBuf;

use anyhow::{Context, Result, bail};

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Quality(i64),
    Intensity(f32),
    /// `None` toggles.
    Wireframe(Option<bool>),
    Load(PathBuf),
    /// `None` uses the configured export path.
    Export(Option<PathBuf>),
    Status,
    Quit,
}

pub const HELP: &str = "commands: quality <1-100> | intensity <0.0-3.0> | wireframe [on|off] | load <path> | export [path] | status | quit";

/// Parse one input line. Blank lines and `#` comments yield `None`.
pub fn parse(line: &str) -> Result<Option<Command>> {
    let line = line.trim();
    if line.is_empty() || line.starts_with('#') {
        return Ok(None);
    }
    let (verb, rest) = match line.split_once(char::is_whitespace) {
        Some((verb, rest)) => (verb, rest.trim()),
        None => (line, ""),
    };

    let cmd = match verb.to_ascii_lowercase().as_str() {
        "quality" | "q" => Command::Quality(
            rest.parse()
                .with_context(|| format!("quality expects an integer, got {rest:?}"))?,
        ),
        "intensity" | "i" => Command::Intensity(
            rest.parse()
                .with_context(|| format!("intensity expects a number, got {rest:?}"))?,
        ),
        "wireframe" | "w" => Command::Wireframe(match rest {
            "" | "toggle" => None,
            "on" | "true" | "1" => Some(true),
            "off" | "false" | "0" => Some(false),
            other => bail!("wireframe expects on/off, got {other:?}"),
        }),
        "load" | "open" => {
            if rest.is_empty() {
                bail!("load expects a path");
            }
            Command::Load(PathBuf::from(rest))
        }
        "export" => Command::Export((!rest.is_empty()).then(|| PathBuf::from(rest))),
        "status" => Command::Status,
        "quit" | "exit" => Command::Quit,
        other => bail!("unknown command {other:?}; {HELP}"),
    };
    Ok(Some(cmd))
}
