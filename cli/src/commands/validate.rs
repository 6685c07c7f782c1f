use super::{read_policy, OutputFormat};
use anyhow::Result;
use colored::*;
use policies::Policy;
use std::path::Path;

/// Validate a policy document and summarize its entries
pub fn execute(path: &Path, format: OutputFormat) -> Result<()> {
    let policy = read_policy(path)?;

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&policy.to_json())?);
        }
        OutputFormat::Yaml => {
            println!("{}", serde_yaml::to_string(&policy.to_json())?);
        }
        OutputFormat::Text => print_policy_text(&policy),
    }

    Ok(())
}

fn print_policy_text(policy: &Policy) {
    println!("{}", "=== Policy ===".bold());
    println!();
    println!("{}: {}", "Id".bold(), policy.id().to_string().cyan());
    println!("{}: {}", "Revision".bold(), policy.revision().to_string().magenta());
    println!("{}: {:?}", "Lifecycle".bold(), policy.lifecycle());
    println!();

    for entry in policy.entries() {
        println!("{}", format!("[{}]", entry.label()).cyan().bold());
        let subjects: Vec<String> = entry.subjects().map(|s| s.id().to_string()).collect();
        println!("  {}: {}", "subjects".cyan(), subjects.join(", ").yellow());
        for (resource, permissions) in entry.resources() {
            print!("  {}", resource.to_string().green());
            if !permissions.granted().is_empty() {
                let granted: Vec<&str> = permissions.granted().iter().map(String::as_str).collect();
                print!(" grant={}", granted.join(",").blue());
            }
            if !permissions.revoked().is_empty() {
                let revoked: Vec<&str> = permissions.revoked().iter().map(String::as_str).collect();
                print!(" revoke={}", revoked.join(",").red());
            }
            println!();
        }
        println!();
    }

    println!(
        "{}",
        format!("Policy is valid ({} entries)", policy.entry_count()).green()
    );
}
