//! Field map construction from the instance skeleton and `<bind>`
//! declarations.

use std::collections::{BTreeMap, HashMap};

use tracing::{debug, warn};
use xform_xml::Element;

use crate::diagnostics::Diagnostic;
use crate::expr::{parse_boolean, parse_condition, BooleanGroup, ConditionExpression};
use crate::itext::TranslationTable;
use crate::{path, FormError, MAX_DEPTH};

/// Field type assigned to every instance node until a bind overrides it.
pub const DEFAULT_TYPE: &str = "string";

/// A boolean rule (`relevant` or `constraint`) with its optional message.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Rule {
    pub condition: BooleanGroup,
    pub message: Option<String>,
}

/// One node of the instance skeleton, enriched by its bind declaration.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct FieldDefinition {
    pub path: String,
    pub is_container: bool,
    pub field_type: String,
    pub default_value: Option<String>,
    /// `None` unless a bind declares `required`.
    pub required: Option<bool>,
    /// `None` unless a bind declares `readonly`.
    pub readonly: Option<bool>,
    pub calculate: Option<ConditionExpression>,
    pub constraint: Option<Rule>,
    pub relevant: Option<Rule>,
    /// Remaining bind attributes, verbatim, keyed by qualified name.
    pub attributes: BTreeMap<String, String>,
}

impl FieldDefinition {
    fn new(path: String, is_container: bool, default_value: Option<String>) -> Self {
        FieldDefinition {
            path,
            is_container,
            field_type: DEFAULT_TYPE.to_string(),
            default_value,
            required: None,
            readonly: None,
            calculate: None,
            constraint: None,
            relevant: None,
            attributes: BTreeMap::new(),
        }
    }
}

/// Fields keyed by path, iterable in document order.
#[derive(Debug, Clone, Default)]
pub struct FieldMap {
    fields: HashMap<String, FieldDefinition>,
    order: Vec<String>,
}

impl FieldMap {
    pub fn get(&self, path: &str) -> Option<&FieldDefinition> {
        self.fields.get(path)
    }

    pub fn contains(&self, path: &str) -> bool {
        self.fields.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    /// Fields in instance document order.
    pub fn iter(&self) -> impl Iterator<Item = &FieldDefinition> {
        self.order.iter().filter_map(|path| self.fields.get(path))
    }

    /// Insert a field unless its path is already taken. Returns whether the
    /// field was inserted.
    fn insert(&mut self, field: FieldDefinition) -> bool {
        if self.fields.contains_key(&field.path) {
            return false;
        }
        self.order.push(field.path.clone());
        self.fields.insert(field.path.clone(), field);
        true
    }

    fn get_mut(&mut self, path: &str) -> Option<&mut FieldDefinition> {
        self.fields.get_mut(path)
    }
}

/// Everything the loader extracts from the document head.
#[derive(Debug)]
pub struct Definition {
    /// `"/" + instance root tag`.
    pub root_path: String,
    pub form_id: Option<String>,
    pub version: Option<String>,
    pub title: Option<String>,
    pub fields: FieldMap,
    pub translations: TranslationTable,
    pub diagnostics: Vec<Diagnostic>,
}

/// Builds a [`Definition`] from a document `<head>`. One loader handles one
/// document; [`load`](Self::load) consumes it.
#[derive(Debug, Default)]
pub struct DefinitionLoader {
    fields: FieldMap,
    diagnostics: Vec<Diagnostic>,
}

impl DefinitionLoader {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn load(mut self, head: &Element) -> Result<Definition, FormError> {
        let model = head.find_descendant("model");
        let instance = model
            .and_then(|model| model.child("instance"))
            .or_else(|| head.find_descendant("instance"))
            .ok_or_else(|| FormError::Definition("no <instance> element".into()))?;
        let root = instance
            .children
            .first()
            .ok_or_else(|| FormError::Definition("<instance> has no child element".into()))?;

        let root_path = format!("/{}", root.name);
        self.walk_instance(root, "", 0)?;
        debug!(root = %root_path, fields = self.fields.len(), "walked instance skeleton");

        if let Some(model) = model {
            for bind in model.children_named("bind") {
                self.apply_bind(bind, &root_path);
            }
        }

        let itext = model
            .and_then(|model| model.child("itext"))
            .or_else(|| head.find_descendant("itext"));
        let translations = match itext {
            Some(itext) => {
                let (table, diagnostics) = TranslationTable::from_itext(itext);
                self.diagnostics.extend(diagnostics);
                table
            }
            None => TranslationTable::default(),
        };

        Ok(Definition {
            root_path,
            form_id: root.attr("id").map(String::from),
            version: root.attr("version").map(String::from),
            title: head.child("title").and_then(Element::text).map(String::from),
            fields: self.fields,
            translations,
            diagnostics: self.diagnostics,
        })
    }

    fn walk_instance(
        &mut self,
        node: &Element,
        parent_path: &str,
        depth: usize,
    ) -> Result<(), FormError> {
        if depth > MAX_DEPTH {
            return Err(FormError::TooDeep { depth });
        }
        let path = format!("{parent_path}/{}", node.name);
        let is_container = node.has_children();
        let default_value = if is_container {
            None
        } else {
            node.text().map(String::from)
        };
        if !self
            .fields
            .insert(FieldDefinition::new(path.clone(), is_container, default_value))
        {
            debug!(%path, "duplicate instance node, keeping first");
        }
        for child in &node.children {
            self.walk_instance(child, &path, depth + 1)?;
        }
        Ok(())
    }

    /// Merge one `<bind>` into its field. Applying the same bind again leaves
    /// the field unchanged.
    pub(crate) fn apply_bind(&mut self, bind: &Element, root_path: &str) {
        let nodeset = bind.attr("nodeset").unwrap_or_default();
        let path = path::resolve(nodeset, root_path);
        let Some(field) = self.fields.get_mut(&path) else {
            let diagnostic = Diagnostic::BindMismatch {
                nodeset: nodeset.to_string(),
            };
            warn!(%diagnostic, "ignoring bind");
            self.diagnostics.push(diagnostic);
            return;
        };

        let message = bind.attr_local("constraintMsg").map(String::from);
        for attr in &bind.attributes {
            match attr.local_name() {
                "nodeset" | "constraintMsg" => {}
                "required" => field.required = Some(attr.value == "true()"),
                "readonly" => field.readonly = Some(attr.value == "true()"),
                "type" => field.field_type = attr.value.clone(),
                "calculate" => {
                    let expr = parse_condition(&attr.value, &path);
                    if expr.is_literal() {
                        self.diagnostics
                            .push(unrecognized(&path, &attr.name, &attr.value));
                    }
                    field.calculate = Some(expr);
                }
                name @ ("constraint" | "relevant") => {
                    let condition = parse_boolean(&attr.value, &path);
                    if condition.has_unparsed_terms() {
                        self.diagnostics
                            .push(unrecognized(&path, &attr.name, &attr.value));
                    }
                    let rule = Rule {
                        condition,
                        message: message.clone(),
                    };
                    if name == "constraint" {
                        field.constraint = Some(rule);
                    } else {
                        field.relevant = Some(rule);
                    }
                }
                _ => {
                    field.attributes.insert(attr.name.clone(), attr.value.clone());
                }
            }
        }
        debug!(%path, "applied bind");
    }
}

fn unrecognized(path: &str, attribute: &str, raw: &str) -> Diagnostic {
    let diagnostic = Diagnostic::UnrecognizedExpression {
        path: path.to_string(),
        attribute: attribute.to_string(),
        raw: raw.to_string(),
    };
    warn!(%diagnostic, "expression kept as literal");
    diagnostic
}
