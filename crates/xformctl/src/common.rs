use std::fs;
use std::path::Path;

use anyhow::{Context, Result};
use serde::Serialize;
use xform_core::FormModel;

pub fn load_model(path: &Path) -> Result<FormModel> {
    let xml = fs::read_to_string(path).with_context(|| format!("read {}", path.display()))?;
    FormModel::parse(&xml).with_context(|| format!("load form definition {}", path.display()))
}

pub fn print_json<T: Serialize>(value: &T) -> Result<()> {
    let text = serde_json::to_string_pretty(value).context("serialise JSON output")?;
    println!("{text}");
    Ok(())
}

/// `"-"` for absent values in table output.
pub fn or_dash(value: Option<&str>) -> &str {
    match value {
        Some(value) if !value.is_empty() => value,
        _ => "-",
    }
}

pub fn flag(value: Option<bool>) -> &'static str {
    match value {
        Some(true) => "yes",
        Some(false) => "no",
        None => "-",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_placeholders() {
        assert_eq!(or_dash(None), "-");
        assert_eq!(or_dash(Some("")), "-");
        assert_eq!(or_dash(Some("int")), "int");
        assert_eq!(flag(Some(true)), "yes");
        assert_eq!(flag(None), "-");
    }

    #[test]
    fn missing_file_has_context() {
        let err = load_model(Path::new("/nonexistent/form.xml")).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/form.xml"), "{err}");
    }
}
