//! Control tree built from the presentation `<body>`.

use tracing::{debug, trace, warn};
use xform_xml::Element;

use crate::diagnostics::Diagnostic;
use crate::itext::{Label, TranslationTable};
use crate::loader::FieldMap;
use crate::{path, FormError, MAX_DEPTH};

/// Kind of a leaf control.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ControlKind {
    Input,
    /// `select` and `select1`.
    Select,
    /// Any other tag (`upload`, `trigger`, `range`, ...), kept by name.
    Other(String),
}

impl ControlKind {
    pub fn as_str(&self) -> &str {
        match self {
            ControlKind::Input => "input",
            ControlKind::Select => "select",
            ControlKind::Other(tag) => tag,
        }
    }
}

/// One `<item>` of a select control.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct SelectOption {
    pub label: Option<Label>,
    pub value: String,
}

impl SelectOption {
    fn from_item(item: &Element) -> Self {
        SelectOption {
            label: item.child("label").and_then(Label::from_element),
            value: item
                .child("value")
                .and_then(Element::text)
                .unwrap_or_default()
                .to_string(),
        }
    }
}

/// Leaf presentation node.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct Control {
    /// Field path this control edits; empty when the node has no `ref`.
    pub path: String,
    pub kind: ControlKind,
    /// `true` for `select` (multiple choice), `false` for `select1`.
    pub multiple: bool,
    pub label: Option<Label>,
    pub hint: Option<Label>,
    pub appearance: Option<String>,
    /// Static options, select controls only.
    pub children: Vec<SelectOption>,
    /// `nodeset` of an `<itemset>` supplying dynamic options.
    pub item_set: Option<String>,
}

/// `<group>` node; repeats nested directly inside mark it repeatable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
pub struct ControlGroup {
    pub path: Option<String>,
    pub label: Option<Label>,
    pub hint: Option<Label>,
    pub appearance: Option<String>,
    pub is_repeat: bool,
    pub list: Vec<ControlNode>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize))]
#[cfg_attr(feature = "serde", serde(rename_all = "snake_case"))]
pub enum ControlNode {
    Control(Control),
    Group(ControlGroup),
}

/// Capabilities shared by every presentation node.
pub trait FormControl {
    /// `"input"`, `"select"`, `"group"`, or the raw tag name.
    fn node_type(&self) -> &str;
    fn path(&self) -> Option<&str>;
    fn label(&self) -> Option<&Label>;
    fn hint(&self) -> Option<&Label>;
    fn appearance(&self) -> Option<&str>;

    fn label_text<'a>(&'a self, translations: &'a TranslationTable, lang: Option<&str>) -> &'a str {
        translations.get_text(self.label(), lang)
    }

    fn hint_text<'a>(&'a self, translations: &'a TranslationTable, lang: Option<&str>) -> &'a str {
        translations.get_text(self.hint(), lang)
    }

    /// Whether the bound field is declared `required`. Unbound controls are
    /// never required.
    fn is_required(&self, fields: &FieldMap) -> bool {
        self.path()
            .and_then(|path| fields.get(path))
            .and_then(|field| field.required)
            .unwrap_or(false)
    }

    fn default_value<'f>(&self, fields: &'f FieldMap) -> Option<&'f str> {
        fields.get(self.path()?)?.default_value.as_deref()
    }

    /// HTML-safe element name derived from the path.
    fn element_name(&self) -> Option<String> {
        self.path().map(path::element_name)
    }
}

impl FormControl for Control {
    fn node_type(&self) -> &str {
        self.kind.as_str()
    }

    fn path(&self) -> Option<&str> {
        Some(self.path.as_str()).filter(|path| !path.is_empty())
    }

    fn label(&self) -> Option<&Label> {
        self.label.as_ref()
    }

    fn hint(&self) -> Option<&Label> {
        self.hint.as_ref()
    }

    fn appearance(&self) -> Option<&str> {
        self.appearance.as_deref()
    }
}

impl FormControl for ControlGroup {
    fn node_type(&self) -> &str {
        "group"
    }

    fn path(&self) -> Option<&str> {
        self.path.as_deref()
    }

    fn label(&self) -> Option<&Label> {
        self.label.as_ref()
    }

    fn hint(&self) -> Option<&Label> {
        self.hint.as_ref()
    }

    fn appearance(&self) -> Option<&str> {
        self.appearance.as_deref()
    }
}

impl FormControl for ControlNode {
    fn node_type(&self) -> &str {
        match self {
            ControlNode::Control(control) => control.node_type(),
            ControlNode::Group(group) => group.node_type(),
        }
    }

    fn path(&self) -> Option<&str> {
        match self {
            ControlNode::Control(control) => FormControl::path(control),
            ControlNode::Group(group) => FormControl::path(group),
        }
    }

    fn label(&self) -> Option<&Label> {
        match self {
            ControlNode::Control(control) => FormControl::label(control),
            ControlNode::Group(group) => FormControl::label(group),
        }
    }

    fn hint(&self) -> Option<&Label> {
        match self {
            ControlNode::Control(control) => FormControl::hint(control),
            ControlNode::Group(group) => FormControl::hint(group),
        }
    }

    fn appearance(&self) -> Option<&str> {
        match self {
            ControlNode::Control(control) => FormControl::appearance(control),
            ControlNode::Group(group) => FormControl::appearance(group),
        }
    }
}

/// Append every leaf control of `nodes` to `out`, depth first.
pub fn flatten<'a>(nodes: &'a [ControlNode], out: &mut Vec<&'a Control>) {
    for node in nodes {
        match node {
            ControlNode::Control(control) => out.push(control),
            ControlNode::Group(group) => flatten(&group.list, out),
        }
    }
}

/// Traversal state handed down by value; never mutated after construction.
#[derive(Debug, Clone)]
struct BuildContext {
    base_path: String,
    in_group: bool,
    depth: usize,
}

impl BuildContext {
    fn enter_group(&self, base_path: String) -> Self {
        BuildContext {
            base_path,
            in_group: true,
            depth: self.depth + 1,
        }
    }

    fn enter_repeat(&self, base_path: String) -> Self {
        BuildContext {
            base_path,
            in_group: self.in_group,
            depth: self.depth + 1,
        }
    }
}

/// Nodes built for one parent, plus whether a repeat was met among them.
#[derive(Debug, Default)]
struct Branch {
    nodes: Vec<ControlNode>,
    repeat: bool,
}

/// Builds the ordered control tree from `<body>`, using the field map of the
/// same document to report unbound refs.
pub struct ControlTreeBuilder<'a> {
    fields: &'a FieldMap,
    diagnostics: Vec<Diagnostic>,
}

impl<'a> ControlTreeBuilder<'a> {
    pub fn new(fields: &'a FieldMap) -> Self {
        ControlTreeBuilder {
            fields,
            diagnostics: Vec::new(),
        }
    }

    /// Build the tree below `body`; relative refs resolve against `root_path`.
    pub fn build(
        mut self,
        body: &Element,
        root_path: &str,
    ) -> Result<(Vec<ControlNode>, Vec<Diagnostic>), FormError> {
        let ctx = BuildContext {
            base_path: root_path.to_string(),
            in_group: false,
            depth: 0,
        };
        let branch = self.build_list(body, &ctx)?;
        debug!(top_level = branch.nodes.len(), "built control tree");
        Ok((branch.nodes, self.diagnostics))
    }

    fn build_list(&mut self, parent: &Element, ctx: &BuildContext) -> Result<Branch, FormError> {
        if ctx.depth > MAX_DEPTH {
            return Err(FormError::TooDeep { depth: ctx.depth });
        }
        let mut branch = Branch::default();
        for child in &parent.children {
            match child.name.as_str() {
                "label" | "hint" => {}
                "group" => {
                    let group = self.build_group(child, ctx)?;
                    branch.nodes.push(ControlNode::Group(group));
                }
                "repeat" => {
                    let nodeset = child
                        .attr("nodeset")
                        .map(|raw| path::resolve(raw, &ctx.base_path))
                        .unwrap_or_else(|| ctx.base_path.clone());
                    if !ctx.in_group {
                        let diagnostic = Diagnostic::RepeatOutsideGroup {
                            nodeset: nodeset.clone(),
                        };
                        warn!(%diagnostic, "repeat children attached to current list");
                        self.diagnostics.push(diagnostic);
                    }
                    trace!(%nodeset, "entering repeat");
                    branch.repeat = true;
                    if child.has_children() {
                        let inner = self.build_list(child, &ctx.enter_repeat(nodeset))?;
                        branch.nodes.extend(inner.nodes);
                    }
                }
                _ => {
                    let control = self.build_control(child, ctx);
                    branch.nodes.push(ControlNode::Control(control));
                }
            }
        }
        Ok(branch)
    }

    fn build_group(&mut self, element: &Element, ctx: &BuildContext) -> Result<ControlGroup, FormError> {
        let path = element
            .attr("ref")
            .map(|raw| path::resolve(raw, &ctx.base_path));
        let branch = if element.has_children() {
            let base = path.clone().unwrap_or_else(|| ctx.base_path.clone());
            self.build_list(element, &ctx.enter_group(base))?
        } else {
            Branch::default()
        };
        trace!(path = ?path, children = branch.nodes.len(), repeat = branch.repeat, "built group");
        Ok(ControlGroup {
            path,
            label: element.child("label").and_then(Label::from_element),
            hint: element.child("hint").and_then(Label::from_element),
            appearance: element.attr("appearance").map(String::from),
            is_repeat: branch.repeat,
            list: branch.nodes,
        })
    }

    fn build_control(&self, element: &Element, ctx: &BuildContext) -> Control {
        let path = element
            .attr("ref")
            .or_else(|| element.attr("nodeset"))
            .map(|raw| path::resolve(raw, &ctx.base_path))
            .unwrap_or_default();
        if !path.is_empty() && !self.fields.contains(&path) {
            debug!(%path, tag = %element.name, "control ref matches no field");
        }

        let (kind, multiple) = match element.name.as_str() {
            "input" => (ControlKind::Input, false),
            "select1" => (ControlKind::Select, false),
            "select" => (ControlKind::Select, true),
            other => (ControlKind::Other(other.to_string()), false),
        };
        let (children, item_set) = if kind == ControlKind::Select {
            (
                element
                    .children_named("item")
                    .map(SelectOption::from_item)
                    .collect(),
                element
                    .child("itemset")
                    .and_then(|set| set.attr("nodeset"))
                    .map(String::from),
            )
        } else {
            (Vec::new(), None)
        };

        Control {
            path,
            kind,
            multiple,
            label: element.child("label").and_then(Label::from_element),
            hint: element.child("hint").and_then(Label::from_element),
            appearance: element.attr("appearance").map(String::from),
            children,
            item_set,
        }
    }
}
