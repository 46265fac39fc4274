use std::collections::HashSet;
use std::path::Path;

use regex::Regex;
use serde::Deserialize;

use crate::cli::Cli;
use crate::error::{Error, Result};
use crate::model::Reviewer;

pub const DEFAULT_CONFIG_PATH: &str = "claude-step.toml";
pub const DEFAULT_SPEC_FILE: &str = "SPEC.md";

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub project: Option<String>,
    pub spec_file: Option<String>,
    #[serde(default)]
    pub reviewers: Vec<Reviewer>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub project: String,
    pub spec_file: String,
    pub reviewers: Vec<Reviewer>,
}

impl Config {
    pub fn load(cli: &Cli) -> Result<Self> {
        let config_path = Path::new(cli.config.as_deref().unwrap_or(DEFAULT_CONFIG_PATH));
        if !config_path.exists() {
            return Err(Error::ConfigNotFound(config_path.to_path_buf()));
        }
        let content = std::fs::read_to_string(config_path)?;
        let file_config = parse_config(&content)?;
        merge(file_config, cli)
    }
}

pub fn parse_config(content: &str) -> Result<ConfigFile> {
    let config: ConfigFile = toml::from_str(content)?;
    validate(&config)?;
    Ok(config)
}

fn validate(config: &ConfigFile) -> Result<()> {
    let mut seen = HashSet::new();
    for reviewer in &config.reviewers {
        if reviewer.username.is_empty() {
            return Err(Error::ConfigValidation(
                "reviewer username must not be empty".to_string(),
            ));
        }
        if !seen.insert(reviewer.username.as_str()) {
            return Err(Error::ConfigValidation(format!(
                "duplicate reviewer: {}",
                reviewer.username
            )));
        }
    }
    Ok(())
}

pub fn merge(file: ConfigFile, cli: &Cli) -> Result<Config> {
    let project = cli
        .project
        .clone()
        .or(file.project)
        .ok_or_else(|| Error::ConfigValidation("project is required".to_string()))?;

    // Project names end up in branch names; keep them branch-safe.
    let project_re = Regex::new(r"^[a-z0-9-]+$").unwrap();
    if !project_re.is_match(&project) {
        return Err(Error::ConfigValidation(format!(
            "invalid project name: {project} (allowed: a-z, 0-9, -)"
        )));
    }

    Ok(Config {
        project,
        spec_file: cli
            .spec
            .clone()
            .or(file.spec_file)
            .unwrap_or_else(|| DEFAULT_SPEC_FILE.to_string()),
        reviewers: file.reviewers,
    })
}
