use anyhow::{bail, Context, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Default locality tag appended to every ingested transcript.
pub const DEFAULT_LOCALITY_TAG: &str = "oradea";

/// Generator (language model) configuration block from config.toml.
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct GeneratorConfig {
    pub api_key: Option<String>,
    pub api_key_command: Option<String>,
    pub base_url: Option<String>,
    pub model: Option<String>,
}

/// Ingestion configuration block.
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct IngestConfig {
    pub locality_tag: Option<String>,
}

/// Top-level tqa config file structure.
#[derive(Debug, Deserialize, Serialize, Default, Clone)]
pub struct TqaConfig {
    pub generator: Option<GeneratorConfig>,
    pub ingest: Option<IngestConfig>,
}

impl TqaConfig {
    /// Load config from ~/.tqa/config.toml. Returns default if file doesn't exist.
    pub fn load() -> Result<Self> {
        let path = config_path()?;
        if !path.exists() {
            return Ok(TqaConfig::default());
        }
        let content = std::fs::read_to_string(&path)
            .with_context(|| format!("Failed to read config: {}", path.display()))?;
        let config: TqaConfig =
            toml::from_str(&content).with_context(|| "Failed to parse config.toml")?;
        Ok(config)
    }

    /// Locality tag for ingestion, falling back to the default.
    pub fn locality_tag(&self) -> String {
        self.ingest
            .as_ref()
            .and_then(|i| i.locality_tag.clone())
            .unwrap_or_else(|| DEFAULT_LOCALITY_TAG.to_string())
    }

    /// Display config with secrets redacted.
    pub fn display_redacted(&self) -> String {
        let mut lines = Vec::new();
        if let Some(ref g) = self.generator {
            lines.push("[generator]".to_string());
            if let Some(ref key) = g.api_key {
                let redacted = if key.len() > 8 {
                    format!("{}...{}", &key[..4], &key[key.len() - 4..])
                } else {
                    "****".to_string()
                };
                lines.push(format!("  api_key = \"{}\"", redacted));
            }
            if let Some(ref cmd) = g.api_key_command {
                lines.push(format!("  api_key_command = \"{}\"", cmd));
            }
            if let Some(ref url) = g.base_url {
                lines.push(format!("  base_url = \"{}\"", url));
            }
            if let Some(ref model) = g.model {
                lines.push(format!("  model = \"{}\"", model));
            }
        }
        if let Some(ref i) = self.ingest {
            lines.push("[ingest]".to_string());
            if let Some(ref tag) = i.locality_tag {
                lines.push(format!("  locality_tag = \"{}\"", tag));
            }
        }
        if lines.is_empty() {
            lines.push("(nothing configured)".to_string());
        }
        lines.join("\n")
    }
}

/// Resolve the generator credential through the chain:
/// CLI flag > env var > config key > config command.
pub fn resolve_credential(
    cli_flag: Option<&str>,
    env_var_name: &str,
    config: Option<&GeneratorConfig>,
) -> Result<String> {
    // 1. CLI flag
    if let Some(key) = cli_flag {
        if !key.is_empty() {
            return Ok(key.to_string());
        }
    }

    // 2. Environment variable
    if let Ok(val) = std::env::var(env_var_name) {
        if !val.is_empty() {
            return Ok(val);
        }
    }

    if let Some(gc) = config {
        // 3. Config file api_key
        if let Some(ref key) = gc.api_key {
            if !key.is_empty() {
                return Ok(key.clone());
            }
        }

        // 4. External command
        if let Some(ref cmd) = gc.api_key_command {
            if !cmd.is_empty() {
                let output = std::process::Command::new("sh")
                    .arg("-c")
                    .arg(cmd)
                    .output()
                    .with_context(|| format!("Failed to run api_key_command: {cmd}"))?;

                if !output.status.success() {
                    let stderr = String::from_utf8_lossy(&output.stderr);
                    bail!(
                        "api_key_command failed (exit {}): {}",
                        output.status.code().unwrap_or(-1),
                        stderr.trim()
                    );
                }

                let secret = String::from_utf8(output.stdout)
                    .context("api_key_command output is not valid UTF-8")?
                    .trim()
                    .to_string();

                if !secret.is_empty() {
                    return Ok(secret);
                }
            }
        }
    }

    bail!(
        "No API key found. Provide via --api-key, {} env var, or ~/.tqa/config.toml",
        env_var_name
    );
}

/// Path to the config file: ~/.tqa/config.toml
pub fn config_path() -> Result<PathBuf> {
    let home = dirs::home_dir().context("Could not determine home directory")?;
    Ok(home.join(".tqa").join("config.toml"))
}

/// Default config template content.
pub fn default_config_template() -> &'static str {
    r#"# ~/.tqa/config.toml
# Credential resolution order: CLI flag > env var > api_key > api_key_command

[generator]
# api_key = "your-api-key"
# api_key_command = "your-secrets-manager-command-here"
# base_url = "https://api.openai.com/v1"
# model = "gpt-4o-mini"

[ingest]
# locality_tag = "oradea"
"#
}

/// Create the default config file if it doesn't already exist.
pub fn init_config() -> Result<bool> {
    let path = config_path()?;
    if path.exists() {
        return Ok(false);
    }
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    std::fs::write(&path, default_config_template())?;
    Ok(true)
}
