//! XForm model: field map, condition expressions, translations and the
//! presentation control tree of a form definition.

pub mod controls;
pub mod diagnostics;
pub mod document;
pub mod expr;
pub mod itext;
pub mod loader;
pub mod path;

use thiserror::Error;
use tracing::info;
use xform_xml::{Element, XmlError};

pub use controls::{
    Control, ControlGroup, ControlKind, ControlNode, ControlTreeBuilder, FormControl, SelectOption,
};
pub use diagnostics::Diagnostic;
pub use document::FormDocument;
pub use expr::{
    parse_boolean, parse_condition, BooleanGroup, ConditionExpression, Disjunct, FunctionName,
    MatchOp,
};
pub use itext::{Label, TextRef, TranslationTable};
pub use loader::{DefinitionLoader, FieldDefinition, FieldMap, Rule};

/// Maximum nesting followed by the instance walk and the control-tree builder.
pub const MAX_DEPTH: usize = 128;

/// Fatal error aborting a form load.
#[derive(Debug, Error)]
pub enum FormError {
    /// The document text is not well-formed XML.
    #[error(transparent)]
    Xml(#[from] XmlError),
    /// Malformed root element, namespace declarations, or head/body layout.
    #[error("schema error: {0}")]
    Schema(String),
    /// Missing `<instance>` or instance without a root element.
    #[error("definition error: {0}")]
    Definition(String),
    /// Nesting deeper than [`MAX_DEPTH`].
    #[error("nesting too deep at level {depth}")]
    TooDeep { depth: usize },
}

/// Loaded form: fields, translations and control tree of one document.
#[derive(Debug)]
pub struct FormModel {
    title: Option<String>,
    form_id: Option<String>,
    version: Option<String>,
    root_path: String,
    fields: FieldMap,
    translations: TranslationTable,
    controls: Vec<ControlNode>,
    diagnostics: Vec<Diagnostic>,
}

impl FormModel {
    /// Parse document text and load it.
    pub fn parse(xml: &str) -> Result<Self, FormError> {
        let root = xform_xml::parse(xml)?;
        Self::from_element(&root)
    }

    /// Load an already parsed document. Fails without exposing any partial
    /// model.
    pub fn from_element(root: &Element) -> Result<Self, FormError> {
        let document = FormDocument::locate(root)?;
        let definition = DefinitionLoader::new().load(document.head)?;
        let (controls, control_diagnostics) =
            ControlTreeBuilder::new(&definition.fields).build(document.body, &definition.root_path)?;

        let mut diagnostics = definition.diagnostics;
        diagnostics.extend(control_diagnostics);

        info!(
            root = %definition.root_path,
            fields = definition.fields.len(),
            controls = controls.len(),
            languages = definition.translations.languages().len(),
            diagnostics = diagnostics.len(),
            "loaded form definition"
        );

        Ok(FormModel {
            title: definition.title,
            form_id: definition.form_id,
            version: definition.version,
            root_path: definition.root_path,
            fields: definition.fields,
            translations: definition.translations,
            controls,
            diagnostics,
        })
    }

    pub fn title(&self) -> Option<&str> {
        self.title.as_deref()
    }

    /// `id` attribute of the instance root.
    pub fn form_id(&self) -> Option<&str> {
        self.form_id.as_deref()
    }

    pub fn version(&self) -> Option<&str> {
        self.version.as_deref()
    }

    /// `"/" + instance root tag`.
    pub fn root_path(&self) -> &str {
        &self.root_path
    }

    pub fn fields(&self) -> &FieldMap {
        &self.fields
    }

    pub fn field(&self, path: &str) -> Option<&FieldDefinition> {
        self.fields.get(path)
    }

    pub fn translations(&self) -> &TranslationTable {
        &self.translations
    }

    /// Top-level controls and groups in document order.
    pub fn controls(&self) -> &[ControlNode] {
        &self.controls
    }

    /// Non-fatal problems met while loading, in encounter order.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diagnostics
    }

    /// Every leaf control, depth first.
    pub fn flat_controls(&self) -> Vec<&Control> {
        let mut out = Vec::new();
        controls::flatten(&self.controls, &mut out);
        out
    }

    /// First leaf control whose path equals `path`.
    pub fn find_control(&self, path: &str) -> Option<&Control> {
        self.flat_controls()
            .into_iter()
            .find(|control| control.path == path)
    }

    /// Shorthand for [`TranslationTable::get_text`].
    pub fn text<'a>(&'a self, label: Option<&'a Label>, lang: Option<&str>) -> &'a str {
        self.translations.get_text(label, lang)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
        <h:html xmlns="http://www.w3.org/2002/xforms"
                xmlns:h="http://www.w3.org/1999/xhtml"
                xmlns:ev="http://www.w3.org/2001/xml-events"
                xmlns:xsd="http://www.w3.org/2001/XMLSchema"
                xmlns:jr="http://openrosa.org/javarosa">
            <h:head>
                <h:title>Visit</h:title>
                <model>
                    <instance>
                        <visit id="visit-form">
                            <reason/>
                            <fever>no</fever>
                            <temperature/>
                        </visit>
                    </instance>
                    <bind nodeset="/visit/reason" required="true()"/>
                    <bind nodeset="/visit/temperature" type="decimal" relevant="selected(../fever, 'yes')"/>
                    <bind nodeset="/nonexistent" required="true()"/>
                    <itext>
                        <translation lang="en">
                            <text id="reason"><value>Reason for visit</value></text>
                        </translation>
                    </itext>
                </model>
            </h:head>
            <h:body>
                <input ref="/visit/reason"><label ref="jr:itext('reason')"/></input>
                <select1 ref="/visit/fever"><label>Fever?</label></select1>
                <input ref="/visit/temperature"><label>Temperature</label></input>
            </h:body>
        </h:html>
    "#;

    #[test]
    fn load_model() {
        let model = FormModel::parse(FIXTURE).expect("load form");
        assert_eq!(model.title(), Some("Visit"));
        assert_eq!(model.form_id(), Some("visit-form"));
        assert_eq!(model.root_path(), "/visit");
        assert_eq!(model.fields().len(), 4);
        assert_eq!(model.controls().len(), 3);

        let reason = model.find_control("/visit/reason").expect("reason control");
        assert!(reason.is_required(model.fields()));
        assert_eq!(reason.label_text(model.translations(), None), "Reason for visit");

        let fever = model.find_control("/visit/fever").expect("fever control");
        assert_eq!(fever.node_type(), "select");
        assert_eq!(fever.default_value(model.fields()), Some("no"));
        assert!(!fever.is_required(model.fields()));

        assert!(model.find_control("/visit/missing").is_none());
        assert_eq!(
            model.diagnostics(),
            [Diagnostic::BindMismatch {
                nodeset: "/nonexistent".into()
            }]
        );
    }

    #[test]
    fn relevant_targets_resolve_to_controls() {
        let model = FormModel::parse(FIXTURE).expect("load form");
        let temperature = model.field("/visit/temperature").expect("field");
        let relevant = temperature.relevant.as_ref().expect("relevant");
        let targets: Vec<&str> = relevant
            .condition
            .terms()
            .flat_map(ConditionExpression::referenced_paths)
            .collect();
        assert_eq!(targets, vec!["/visit/fever"]);
        let control = model.find_control(targets[0]).expect("target control");
        assert_eq!(control.element_name().as_deref(), Some("_visit_fever"));
    }

    #[test]
    fn malformed_xml_is_fatal() {
        let err = FormModel::parse("<html><head>").unwrap_err();
        assert!(matches!(err, FormError::Xml(_)));
    }
}
