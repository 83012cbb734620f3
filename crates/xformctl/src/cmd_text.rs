use std::path::Path;

use anyhow::{bail, Result};
use serde::Serialize;
use tracing::debug;
use xform_core::{Label, TextRef};

use crate::common;

#[derive(Serialize)]
struct TextValue<'a> {
    id: &'a str,
    form: &'a str,
    lang: Option<&'a str>,
    text: &'a str,
}

pub fn run(file: &Path, id: &str, form: &str, lang: Option<&str>, json: bool) -> Result<()> {
    let model = common::load_model(file)?;
    let translations = model.translations();
    if translations.is_empty() {
        bail!("{} has no translations", file.display());
    }
    if let Some(lang) = lang {
        if !translations.languages().iter().any(|known| known == lang) {
            bail!(
                "unknown language {lang}; available: {}",
                translations.languages().join(", ")
            );
        }
    }

    let label = Label::Translated(TextRef {
        text: None,
        translation_id: id.to_string(),
        form: form.to_string(),
    });
    let text = translations.get_text(Some(&label), lang);
    let lang = lang.or(translations.default_language());
    debug!(id, form, lang = ?lang, found = !text.is_empty(), "looked up text");

    if json {
        common::print_json(&TextValue {
            id,
            form,
            lang,
            text,
        })?;
    } else {
        println!("{text}");
    }
    Ok(())
}
