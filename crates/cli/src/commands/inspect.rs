use std::fs;

use anyhow::{Context, Result};
use serde::Serialize;
use sha2::{Digest, Sha256};

use classlens_core::model::{ClassSummary, MemberSummary, Provenance};

use crate::commands::runtime::{open_session, resolve_input_path, RuntimeArgs};

#[derive(Debug, Serialize)]
pub struct InspectReport {
    pub name: String,
    pub found: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sha256: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub class: Option<ClassSummary>,
}

/// Resolve `name` and describe it. With `file`, the class bytes come from
/// that file instead of the runtime's search paths.
pub fn inspect_report(args: &RuntimeArgs, name: &str, file: Option<&str>) -> Result<InspectReport> {
    let session = open_session(args)?;

    let (bytes, sha256) = match file {
        Some(file) => {
            let path = resolve_input_path(file)?;
            let bytes = fs::read(&path)
                .with_context(|| format!("Failed to read class file {}", path.display()))?;
            let digest = format!("{:x}", Sha256::digest(&bytes));
            (Some(bytes), Some(digest))
        }
        None => (None, None),
    };

    let model = session.engine.get_class(
        session.runtime.as_ref(),
        session.scope.as_ref(),
        name,
        bytes.as_deref(),
    )?;

    Ok(InspectReport {
        name: name.to_string(),
        found: model.is_some(),
        sha256,
        class: model.map(|model| model.summary()),
    })
}

pub fn inspect_command(args: &RuntimeArgs, name: &str, file: Option<&str>, json: bool) -> Result<()> {
    let report = inspect_report(args, name, file)?;

    if json {
        println!("{}", serde_json::to_string_pretty(&report)?);
        return Ok(());
    }

    let Some(class) = &report.class else {
        println!("{}: not found", report.name);
        return Ok(());
    };

    println!("Class: {}", class.name);
    let provenance = match class.provenance {
        Provenance::Parsed => "parsed",
        Provenance::Live => "live",
    };
    println!("  Provenance: {}", provenance);
    println!("  Scope: {}", class.scope.as_deref().unwrap_or("<bootstrap>"));
    println!("  Version: {}", class.version);
    println!("  Access: 0x{:04x}", class.access);
    println!("  Superclass: {}", class.super_name.as_deref().unwrap_or("(none)"));
    if class.interfaces.is_empty() {
        println!("  Interfaces: (none)");
    } else {
        println!("  Interfaces: {}", class.interfaces.join(", "));
    }
    if let Some(hash) = &report.sha256 {
        println!("  SHA-256: {}", hash);
    }

    println!("Fields:");
    print_members(&class.fields);
    println!("Methods:");
    print_members(&class.methods);

    Ok(())
}

fn print_members(members: &[MemberSummary]) {
    if members.is_empty() {
        println!("  (none)");
        return;
    }
    for member in members {
        match member.instructions {
            Some(1) => println!("  - {} {} (1 instruction)", member.name, member.descriptor),
            Some(count) => {
                println!("  - {} {} ({} instructions)", member.name, member.descriptor, count)
            }
            None => println!("  - {} {}", member.name, member.descriptor),
        }
    }
}

/// Whether the class file for `name` exists on the selected resource path.
pub fn has_class_command(args: &RuntimeArgs, name: &str) -> Result<bool> {
    let session = open_session(args)?;
    let found =
        session.engine.has_class(session.runtime.as_ref(), session.scope.as_ref(), name)?;
    println!("{}", found);
    Ok(found)
}
