use std::path::Path;

use anyhow::Result;
use tracing::info;
use xform_core::FieldDefinition;

use crate::common;

pub fn run(file: &Path, json: bool) -> Result<()> {
    let model = common::load_model(file)?;
    info!(root = model.root_path(), count = model.fields().len(), "loaded fields");

    if json {
        let fields: Vec<&FieldDefinition> = model.fields().iter().collect();
        common::print_json(&fields)?;
        return Ok(());
    }

    println!(
        "{:<40} {:<10} {:<8} {:<8} {}",
        "PATH", "TYPE", "REQ", "RO", "DEFAULT"
    );
    for field in model.fields().iter() {
        let kind = if field.is_container {
            "group"
        } else {
            field.field_type.as_str()
        };
        println!(
            "{:<40} {:<10} {:<8} {:<8} {}",
            field.path,
            kind,
            common::flag(field.required),
            common::flag(field.readonly),
            common::or_dash(field.default_value.as_deref()),
        );
        if let Some(relevant) = &field.relevant {
            println!("    relevant: {}", relevant.condition);
        }
        if let Some(constraint) = &field.constraint {
            match &constraint.message {
                Some(message) => println!("    constraint: {} ({message})", constraint.condition),
                None => println!("    constraint: {}", constraint.condition),
            }
        }
        if let Some(calculate) = &field.calculate {
            println!("    calculate: {calculate}");
        }
    }

    Ok(())
}
