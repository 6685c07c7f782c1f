pub mod check;
pub mod config;
pub mod prune;
pub mod validate;

use anyhow::{Context, Result};
use authz::AuthorizationContext;
use clap::ValueEnum;
use policies::Policy;
use serde_json::Value;
use std::fs;
use std::path::Path;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    Text,
    Json,
    Yaml,
}

/// Read and parse a policy document.
pub fn read_policy(path: &Path) -> Result<Policy> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read policy file {:?}", path))?;
    let policy = Policy::from_json_str(&raw)
        .with_context(|| format!("Invalid policy document {:?}", path))?;
    tracing::debug!(
        "Loaded policy {} revision={} entries={}",
        policy.id(),
        policy.revision(),
        policy.entry_count()
    );
    Ok(policy)
}

/// Read any JSON document.
pub fn read_json(path: &Path) -> Result<Value> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read document {:?}", path))?;
    serde_json::from_str(&raw).with_context(|| format!("Invalid JSON in {:?}", path))
}

pub fn parse_subjects(subjects: &[String]) -> Result<AuthorizationContext> {
    AuthorizationContext::parse(subjects).context("Invalid subject")
}
