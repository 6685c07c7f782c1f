use super::{parse_subjects, read_policy, OutputFormat};
use anyhow::{Context, Result};
use authz::Enforcer;
use colored::*;
use policies::ResourceKey;
use serde_json::json;
use std::path::PathBuf;

pub struct CheckArgs {
    pub policy: PathBuf,
    pub subjects: Vec<String>,
    pub resource: String,
    pub permission: String,
    pub on_or_below: bool,
    pub format: OutputFormat,
}

/// Decide a single permission question against a policy file.
///
/// A denial is an answer, not a failure: the exit code is 0 either way.
pub fn execute(args: CheckArgs) -> Result<()> {
    let policy = read_policy(&args.policy)?;
    let subjects = parse_subjects(&args.subjects)?;
    let resource = ResourceKey::parse(&args.resource).context("Invalid resource key")?;

    let enforcer = Enforcer::new(&policy)?;
    let allowed = if args.on_or_below {
        enforcer.has_permission_on_or_below(&resource, &subjects, &args.permission)
    } else {
        enforcer.has_permission(&resource, &subjects, &args.permission)
    };
    tracing::debug!(
        "Checked {} on {} for {} subject(s): allowed={}",
        args.permission,
        resource,
        subjects.len(),
        allowed
    );

    match args.format {
        OutputFormat::Json | OutputFormat::Yaml => {
            let subjects: Vec<String> = subjects.iter().map(ToString::to_string).collect();
            let report = json!({
                "policyId": policy.id().to_string(),
                "revision": policy.revision(),
                "resource": resource.to_string(),
                "permission": args.permission,
                "onOrBelow": args.on_or_below,
                "subjects": subjects,
                "allowed": allowed,
            });
            if args.format == OutputFormat::Json {
                println!("{}", serde_json::to_string_pretty(&report)?);
            } else {
                println!("{}", serde_yaml::to_string(&report)?);
            }
        }
        OutputFormat::Text => {
            if allowed {
                println!("{}", "ALLOWED".green().bold());
            } else {
                println!("{}", "DENIED".red().bold());
            }
        }
    }

    Ok(())
}
