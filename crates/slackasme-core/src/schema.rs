//! JSON schema and example config generation.
//!
//! `slackasme init` writes both files into the config directory;
//! `slackasme config schema` prints the schema alone. The example config is
//! the serialized default [`AppConfig`] with a short note above each section.

use std::fmt::Write as _;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use schemars::generate::SchemaSettings;
use serde_json::{Value, json};

use crate::config::AppConfig;
use crate::env_prefix;
use crate::paths::create_private_dir;

/// Generated schema filename.
pub const SCHEMA_FILENAME: &str = "config.schema.json";

/// Generated config filename.
pub const CONFIG_FILENAME: &str = "config.toml";

/// Repository URL used for the schema `$id`.
pub const REPO_URL: &str = "https://github.com/byteowlz/slackasme";

/// Comment placed above each `[section]` of the example config.
const SECTION_NOTES: &[(&str, &str)] = &[
    (
        "logging",
        "Log verbosity. Set `file` to append log records to a file instead of stderr.",
    ),
    ("runtime", "Timeout in seconds for every Web API request."),
    (
        "slack",
        "Web API base URL. Point it at a proxy or a local test server.",
    ),
    (
        "output",
        "Rows shown by list commands when --limit is not given (1-1000).",
    ),
    (
        "paths",
        "Set `token_file` to keep the user token somewhere other than next to this file.",
    ),
];

/// Files written by [`write_generated_files`].
#[derive(Debug, Clone)]
pub struct GeneratedFiles {
    /// The example `config.toml`.
    pub config: PathBuf,
    /// The JSON schema next to it.
    pub schema: PathBuf,
}

/// Generate the draft-07 JSON schema for [`AppConfig`].
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn generate_schema(project_name: &str, repo_url: &str) -> Result<String> {
    let mut schema = SchemaSettings::draft07()
        .into_generator()
        .into_root_schema_for::<AppConfig>();

    let prefix = env_prefix();
    let metadata = [
        ("$id", json!(format!("{repo_url}/schemas/{SCHEMA_FILENAME}"))),
        ("title", json!(format!("{project_name} configuration"))),
        (
            "description",
            json!(format!(
                "Configuration schema for {project_name}. Any key can also be set \
                 from the environment as {prefix}__SECTION__KEY."
            )),
        ),
    ];
    for (key, value) in metadata {
        schema.insert(key.to_string(), value);
    }

    // `$schema` is skipped on the struct but editors still expect to see it.
    if let Some(properties) = schema.get_mut("properties").and_then(Value::as_object_mut) {
        properties.insert(
            "$schema".to_string(),
            json!({
                "type": "string",
                "description": "Path or URL of this schema, for editor support"
            }),
        );
    }

    serde_json::to_string_pretty(&schema).context("serializing JSON schema")
}

/// Generate the example `config.toml` from the default [`AppConfig`].
///
/// # Errors
///
/// Returns an error if TOML serialization fails.
pub fn generate_example_config(project_name: &str) -> Result<String> {
    let defaults = toml::to_string_pretty(&AppConfig::default())
        .context("serializing default config to TOML")?;

    let prefix = env_prefix();
    let mut output = String::new();
    let _ = writeln!(output, "\"$schema\" = \"./{SCHEMA_FILENAME}\"");
    let _ = writeln!(output);
    let _ = writeln!(output, "# Configuration for {project_name}.");
    let _ = writeln!(
        output,
        "# Environment overrides: {prefix}__SECTION__KEY (e.g. {prefix}__SLACK__API_URL)."
    );
    let _ = writeln!(output);

    for line in defaults.lines() {
        if let Some(note) = section_name(line).and_then(section_note) {
            let _ = writeln!(output, "# {note}");
        }
        let _ = writeln!(output, "{line}");
    }

    Ok(output)
}

fn section_name(line: &str) -> Option<&str> {
    line.trim()
        .strip_prefix('[')
        .and_then(|rest| rest.strip_suffix(']'))
}

fn section_note(section: &str) -> Option<&'static str> {
    SECTION_NOTES
        .iter()
        .find(|(name, _)| *name == section)
        .map(|&(_, note)| note)
}

/// Write the example config and its schema into `output_dir`.
///
/// The directory is created owner-only; existing files are overwritten.
///
/// # Errors
///
/// Returns an error if directory creation or file writing fails.
pub fn write_generated_files(
    output_dir: &Path,
    project_name: &str,
    repo_url: &str,
) -> Result<GeneratedFiles> {
    create_private_dir(output_dir)?;

    let files = GeneratedFiles {
        config: output_dir.join(CONFIG_FILENAME),
        schema: output_dir.join(SCHEMA_FILENAME),
    };

    fs::write(&files.schema, generate_schema(project_name, repo_url)?)
        .with_context(|| format!("writing schema to {}", files.schema.display()))?;
    fs::write(&files.config, generate_example_config(project_name)?)
        .with_context(|| format!("writing config to {}", files.config.display()))?;

    log::debug!(
        "wrote {} and {}",
        files.config.display(),
        files.schema.display()
    );
    Ok(files)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::APP_NAME;

    fn schema_json() -> Value {
        let text = generate_schema(APP_NAME, REPO_URL).expect("schema generation failed");
        serde_json::from_str(&text).expect("schema is JSON")
    }

    #[test]
    fn schema_carries_metadata_and_sections() {
        let schema = schema_json();
        assert_eq!(schema["title"], "slackasme configuration");
        assert_eq!(
            schema["$id"],
            "https://github.com/byteowlz/slackasme/schemas/config.schema.json"
        );
        assert!(
            schema["description"]
                .as_str()
                .is_some_and(|d| d.contains("SLACKASME__SECTION__KEY"))
        );
        for section in ["$schema", "logging", "runtime", "slack", "output", "paths"] {
            assert!(schema["properties"].get(section).is_some(), "{section}");
        }
    }

    #[test]
    fn schema_bounds_default_limit() {
        let text = generate_schema(APP_NAME, REPO_URL).expect("schema generation failed");
        assert!(text.contains("default_limit"));
        assert!(text.contains("\"maximum\": 1000"));
    }

    #[test]
    fn every_section_has_a_note() {
        let config = generate_example_config(APP_NAME).expect("config generation failed");
        let lines: Vec<&str> = config.lines().collect();

        let mut sections = 0;
        for (i, line) in lines.iter().enumerate() {
            if let Some(name) = section_name(line) {
                sections += 1;
                let note = section_note(name).expect("known section");
                assert_eq!(lines[i - 1], format!("# {note}"), "[{name}]");
            }
        }
        assert!(sections >= 4);
        assert!(config.contains("# Web API base URL."));
        assert!(config.contains("SLACKASME__SLACK__API_URL"));
    }

    #[test]
    fn example_config_round_trips_to_defaults() {
        let config = generate_example_config(APP_NAME).expect("config generation failed");
        let parsed: AppConfig = toml::from_str(&config).expect("example config parses");
        let defaults = AppConfig::default();

        assert_eq!(parsed.schema.as_deref(), Some("./config.schema.json"));
        assert_eq!(parsed.slack.api_url, defaults.slack.api_url);
        assert_eq!(parsed.runtime.timeout, defaults.runtime.timeout);
        assert_eq!(parsed.output.default_limit, defaults.output.default_limit);
        assert_eq!(parsed.logging.level.to_string(), "info");
        assert!(parsed.logging.file.is_none());
        assert!(parsed.paths.token_file.is_none());
    }

    #[test]
    fn generated_files_land_in_output_dir() {
        let dir = tempfile::tempdir().expect("tempdir");
        let files = write_generated_files(dir.path(), APP_NAME, REPO_URL).expect("write files");
        assert_eq!(files.config, dir.path().join(CONFIG_FILENAME));
        assert!(files.schema.is_file());

        let loaded = AppConfig::load_from_path(&files.config).expect("load");
        assert_eq!(loaded.schema.as_deref(), Some("./config.schema.json"));
        assert_eq!(loaded.output.default_limit, 100);
    }
}
