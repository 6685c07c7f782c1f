use super::{parse_subjects, read_json, read_policy};
use anyhow::{Context, Result};
use authz::Enforcer;
use policies::{JsonPointer, ResourceKey};
use std::path::PathBuf;

pub struct PruneArgs {
    pub policy: PathBuf,
    pub document: PathBuf,
    pub subjects: Vec<String>,
    pub resource_type: String,
    pub path: String,
    pub permission: String,
}

/// Print the document as the subjects are allowed to see it.
pub fn execute(args: PruneArgs) -> Result<()> {
    let policy = read_policy(&args.policy)?;
    let document = read_json(&args.document)?;
    let subjects = parse_subjects(&args.subjects)?;

    let pointer = JsonPointer::parse(&args.path).context("Invalid document path")?;
    let root = ResourceKey::new(args.resource_type, pointer).context("Invalid resource type")?;

    let enforcer = Enforcer::new(&policy)?;
    let pruned = authz::prune(&enforcer, &subjects, &root, &document, &args.permission);

    println!("{}", serde_json::to_string_pretty(&pruned)?);
    Ok(())
}
