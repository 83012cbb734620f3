use std::path::Path;

use anyhow::Result;
use serde::Serialize;
use tracing::{info, warn};
use xform_core::Diagnostic;

use crate::common;

#[derive(Serialize)]
struct CheckReport<'a> {
    form_id: Option<&'a str>,
    title: Option<&'a str>,
    version: Option<&'a str>,
    fields: usize,
    controls: usize,
    languages: &'a [String],
    default_language: Option<&'a str>,
    marked_default: Option<&'a str>,
    diagnostics: &'a [Diagnostic],
}

pub fn run(file: &Path, json: bool) -> Result<()> {
    let model = common::load_model(file)?;
    let translations = model.translations();
    let report = CheckReport {
        form_id: model.form_id(),
        title: model.title(),
        version: model.version(),
        fields: model.fields().len(),
        controls: model.flat_controls().len(),
        languages: translations.languages(),
        default_language: translations.default_language(),
        marked_default: translations.marked_default(),
        diagnostics: model.diagnostics(),
    };
    if report.diagnostics.is_empty() {
        info!(file = %file.display(), "form loaded cleanly");
    } else {
        warn!(file = %file.display(), count = report.diagnostics.len(), "form loaded with diagnostics");
    }

    if json {
        return common::print_json(&report);
    }

    println!("form:      {}", common::or_dash(report.form_id));
    println!("title:     {}", common::or_dash(report.title));
    println!("version:   {}", common::or_dash(report.version));
    println!("fields:    {}", report.fields);
    println!("controls:  {}", report.controls);
    if !report.languages.is_empty() {
        println!(
            "languages: {} (default {})",
            report.languages.join(", "),
            common::or_dash(report.default_language)
        );
    }
    if let (Some(marked), Some(default)) = (report.marked_default, report.default_language) {
        if marked != default {
            println!("note:      {marked} is marked default but {default} is used as fallback");
        }
    }
    for diagnostic in report.diagnostics {
        println!("warning:   {diagnostic}");
    }
    Ok(())
}
