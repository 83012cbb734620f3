//! Multilingual text bank (`<itext>`) and label references.

use std::collections::HashMap;

use tracing::{debug, warn};
use xform_xml::Element;

use crate::diagnostics::Diagnostic;
use crate::expr::strip_quotes;

/// Form used when a `<value>` or label reference does not name one.
pub const DEFAULT_FORM: &str = "long";

/// Structured reference into the translation table.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TextRef {
    /// Inline text written next to the reference, if any.
    pub text: Option<String>,
    pub translation_id: String,
    pub form: String,
}

/// Label or hint of a control: plain text or a translation reference.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum Label {
    Plain(String),
    Translated(TextRef),
}

impl Label {
    /// Build a label from a `<label>`/`<hint>` element.
    ///
    /// `ref="jr:itext('id')"` yields [`Label::Translated`]; otherwise the
    /// element text yields [`Label::Plain`]. Elements with neither give `None`.
    pub fn from_element(element: &Element) -> Option<Label> {
        let inline = element
            .text()
            .map(str::trim)
            .filter(|text| !text.is_empty())
            .map(String::from);
        match element.attr("ref").and_then(itext_id) {
            Some(id) => Some(Label::Translated(TextRef {
                text: inline,
                translation_id: id.to_string(),
                form: element.attr("form").unwrap_or(DEFAULT_FORM).to_string(),
            })),
            None => inline.map(Label::Plain),
        }
    }
}

/// Extract `id` from `jr:itext('id')`.
fn itext_id(reference: &str) -> Option<&str> {
    let inner = reference
        .trim()
        .strip_prefix("jr:itext(")?
        .strip_suffix(')')?;
    let id = strip_quotes(inner);
    if id.is_empty() {
        None
    } else {
        Some(id)
    }
}

/// Per-language table of translated text keyed by `"{id}:{form}"`.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct TranslationTable {
    entries: HashMap<String, HashMap<String, String>>,
    languages: Vec<String>,
    default_language: Option<String>,
    marked_default: Option<String>,
}

impl TranslationTable {
    /// Build the table from an `<itext>` element.
    ///
    /// The first `<translation>` block seen becomes the default language.
    /// Malformed blocks and entries are skipped and reported.
    pub fn from_itext(itext: &Element) -> (Self, Vec<Diagnostic>) {
        let mut table = TranslationTable::default();
        let mut diagnostics = Vec::new();

        for (index, block) in itext.children_named("translation").enumerate() {
            let Some(lang) = block.attr("lang") else {
                let diagnostic = Diagnostic::MissingLanguage { index };
                warn!(%diagnostic, "skipping translation block");
                diagnostics.push(diagnostic);
                continue;
            };
            table.add_language(lang);
            if table.marked_default.is_none() && block.attr("default") == Some("true()") {
                table.marked_default = Some(lang.to_string());
            }

            for text in block.children_named("text") {
                match parse_entry(text) {
                    Ok((id, values)) => {
                        for (form, value) in values {
                            table.insert(lang, id, form, value);
                        }
                    }
                    Err(reason) => {
                        let diagnostic = Diagnostic::TranslationEntry {
                            lang: lang.to_string(),
                            id: text.attr("id").map(String::from),
                            reason,
                        };
                        warn!(%diagnostic, "skipping text entry");
                        diagnostics.push(diagnostic);
                    }
                }
            }
        }

        debug!(
            languages = table.languages.len(),
            default = ?table.default_language,
            "built translation table"
        );
        (table, diagnostics)
    }

    fn add_language(&mut self, lang: &str) {
        if self.default_language.is_none() {
            self.default_language = Some(lang.to_string());
        }
        if !self.languages.iter().any(|known| known == lang) {
            self.languages.push(lang.to_string());
        }
    }

    /// Record `value` for `id`/`form` in `lang`; the last write wins.
    pub fn insert(&mut self, lang: &str, id: &str, form: &str, value: &str) {
        self.add_language(lang);
        self.entries
            .entry(lang.to_string())
            .or_default()
            .insert(format!("{id}:{form}"), value.to_string());
    }

    /// Language of the first translation block encountered.
    pub fn default_language(&self) -> Option<&str> {
        self.default_language.as_deref()
    }

    /// Language of the first block carrying `default="true()"`, if any. It
    /// does not change [`default_language`](Self::default_language).
    pub fn marked_default(&self) -> Option<&str> {
        self.marked_default.as_deref()
    }

    /// Languages in document order.
    pub fn languages(&self) -> &[String] {
        &self.languages
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Raw lookup of `"{id}:{form}"` in `lang`.
    pub fn lookup(&self, lang: &str, id: &str, form: &str) -> Option<&str> {
        self.entries
            .get(lang)?
            .get(&format!("{id}:{form}"))
            .map(String::as_str)
    }

    /// Resolve a label to display text.
    ///
    /// Plain labels are returned as-is, a missing label or an unknown
    /// translation yields `""`. `lang` defaults to the default language.
    pub fn get_text<'a>(&'a self, label: Option<&'a Label>, lang: Option<&str>) -> &'a str {
        match label {
            None => "",
            Some(Label::Plain(text)) => text.as_str(),
            Some(Label::Translated(reference)) => {
                let Some(lang) = lang.or(self.default_language.as_deref()) else {
                    return "";
                };
                self.lookup(lang, &reference.translation_id, &reference.form)
                    .unwrap_or("")
            }
        }
    }
}

/// Validate one `<text>` entry, returning its id and `(form, value)` pairs.
fn parse_entry(text: &Element) -> Result<(&str, Vec<(&str, &str)>), String> {
    let id = text
        .attr("id")
        .ok_or_else(|| "missing id attribute".to_string())?;
    let mut values = Vec::new();
    for value in text.children_named("value") {
        let content = value
            .text()
            .ok_or_else(|| "value element has no text".to_string())?;
        values.push((value.attr("form").unwrap_or(DEFAULT_FORM), content));
    }
    if values.is_empty() {
        return Err("no value element".to_string());
    }
    Ok((id, values))
}
