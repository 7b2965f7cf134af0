//! Configuration file parsing for textcode.toml.

use anyhow::{Context, bail};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use textcode_transcoder::{DEFAULT_MAX_PASSES, Options};

use crate::frontend::Mode;

/// Main configuration structure.
#[derive(Debug, Default, Deserialize)]
pub struct Config {
    /// Container output settings
    #[serde(default)]
    pub output: OutputConfig,

    /// Front-end settings
    #[serde(default)]
    pub compile: CompileConfig,
}

/// Container output configuration.
#[derive(Debug, Deserialize)]
pub struct OutputConfig {
    /// Write even when the result is not fully valid text
    #[serde(default)]
    pub force: bool,

    /// Rebuild position tables
    #[serde(default = "default_true")]
    pub line_table: bool,

    /// Container magic as eight hex digits, e.g. "550d0d0a"
    pub magic: Option<String>,

    /// Transcoder pass budget
    #[serde(default = "default_max_passes")]
    pub max_passes: u32,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            force: false,
            line_table: true,
            magic: None,
            max_passes: DEFAULT_MAX_PASSES,
        }
    }
}

impl OutputConfig {
    /// Options described by this section
    pub fn options(&self) -> anyhow::Result<Options> {
        let mut options = Options::new()
            .force(self.force)
            .line_table(self.line_table)
            .max_passes(self.max_passes);
        if let Some(magic) = &self.magic {
            options = options.magic(parse_magic(magic)?);
        }
        Ok(options)
    }
}

/// Front-end configuration.
#[derive(Debug, Default, Deserialize)]
pub struct CompileConfig {
    /// Default compile mode
    #[serde(default)]
    pub mode: Mode,
}

fn default_true() -> bool {
    true
}

fn default_max_passes() -> u32 {
    DEFAULT_MAX_PASSES
}

/// Parse a 4-byte magic written as eight hex digits.
pub fn parse_magic(text: &str) -> anyhow::Result<[u8; 4]> {
    let text = text.trim();
    if text.len() != 8 || !text.is_ascii() {
        bail!("magic must be eight hex digits, got {text:?}");
    }
    let mut magic = [0u8; 4];
    for (i, byte) in magic.iter_mut().enumerate() {
        let pair = &text[2 * i..2 * i + 2];
        *byte = u8::from_str_radix(pair, 16).with_context(|| format!("bad hex pair {pair:?} in magic"))?;
    }
    Ok(magic)
}

/// Load configuration from a file or search for default config files.
pub fn load_config(path: Option<&Path>) -> anyhow::Result<Config> {
    let config_path = path.map(PathBuf::from).or_else(find_config_file);

    match config_path {
        Some(path) if path.exists() => {
            let content = std::fs::read_to_string(&path)?;
            let config: Config = toml::from_str(&content)
                .map_err(|e| anyhow::anyhow!("Failed to parse {}: {}", path.display(), e))?;
            Ok(config)
        }
        _ => Ok(Config::default()),
    }
}

/// Search for configuration file in the current directory and parent directories.
fn find_config_file() -> Option<PathBuf> {
    let cwd = std::env::current_dir().ok()?;

    const CONFIG_NAMES: &[&str] = &["textcode.toml", ".textcoderc.toml"];

    cwd.ancestors()
        .flat_map(|dir| CONFIG_NAMES.iter().map(move |name| dir.join(name)))
        .find(|path| path.exists())
}

#[cfg(test)]
mod tests {
    use super::*;
    use textcode_bytecode::DEFAULT_MAGIC;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(!config.output.force);
        assert!(config.output.line_table);
        assert_eq!(config.compile.mode, Mode::Exec);

        let options = config.output.options().unwrap();
        assert_eq!(options.magic, DEFAULT_MAGIC);
        assert_eq!(options.max_passes, DEFAULT_MAX_PASSES);
    }

    #[test]
    fn test_parse_config() {
        let toml = r#"
[output]
force = true
line_table = false
magic = "420d0d0a"
max_passes = 6

[compile]
mode = "single"
"#;
        let config: Config = toml::from_str(toml).unwrap();
        assert!(config.output.force);
        assert_eq!(config.compile.mode, Mode::Single);

        let options = config.output.options().unwrap();
        assert!(options.force);
        assert!(!options.line_table);
        assert_eq!(options.magic, *b"B\r\r\n");
        assert_eq!(options.max_passes, 6);
    }

    #[test]
    fn test_parse_magic() {
        assert_eq!(parse_magic("550d0d0a").unwrap(), DEFAULT_MAGIC);
        assert!(parse_magic("550d0d").is_err());
        assert!(parse_magic("zz0d0d0a").is_err());
    }

    #[test]
    fn test_load_explicit_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("textcode.toml");
        std::fs::write(&path, "[compile]\nmode = \"single\"\n").unwrap();

        let config = load_config(Some(path.as_path())).unwrap();
        assert_eq!(config.compile.mode, Mode::Single);

        std::fs::write(&path, "[compile]\nmode = 3\n").unwrap();
        assert!(load_config(Some(path.as_path())).is_err());
    }
}
