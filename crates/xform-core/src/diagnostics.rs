use thiserror::Error;

/// Non-fatal problem found while loading a form. Loading continues; the
/// affected declaration is dropped or kept in degraded form.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(tag = "kind", rename_all = "snake_case"))]
pub enum Diagnostic {
    /// A `<bind>` whose nodeset names no known field; the bind is ignored.
    #[error("bind nodeset '{nodeset}' does not match any field")]
    BindMismatch { nodeset: String },
    /// A `<translation>` block without a `lang` attribute; the block is ignored.
    #[error("translation block #{index} has no lang attribute")]
    MissingLanguage { index: usize },
    /// A malformed `<text>` entry; only that entry is skipped.
    #[error("translation '{lang}': skipped text entry '{}': {reason}", .id.as_deref().unwrap_or("?"))]
    TranslationEntry {
        lang: String,
        id: Option<String>,
        reason: String,
    },
    /// An expression (or one of its terms) kept as an unparsed literal.
    #[error("{attribute} on {path}: unrecognised expression '{raw}'")]
    UnrecognizedExpression {
        path: String,
        attribute: String,
        raw: String,
    },
    /// A `<repeat>` that is not nested inside a `<group>`.
    #[error("repeat '{nodeset}' has no enclosing group")]
    RepeatOutsideGroup { nodeset: String },
}
