//! Load XForm definition documents into an owned, namespace-resolved element
//! tree using quick-xml.

use quick_xml::events::{BytesStart, Event};
use quick_xml::name::{Namespace, PrefixDeclaration, ResolveResult};
use quick_xml::NsReader;
use thiserror::Error;
use tracing::trace;

/// Maximum element nesting accepted by [`parse`].
pub const MAX_DEPTH: usize = 256;

/// Default namespace of an XForm document (`xmlns`).
pub const XFORMS_NS: &str = "http://www.w3.org/2002/xforms";
/// XHTML namespace, conventionally bound to the `h` prefix.
pub const XHTML_NS: &str = "http://www.w3.org/1999/xhtml";
/// XML Events namespace, conventionally bound to the `ev` prefix.
pub const EVENTS_NS: &str = "http://www.w3.org/2001/xml-events";
/// XML Schema namespace, conventionally bound to the `xsd` prefix.
pub const XSD_NS: &str = "http://www.w3.org/2001/XMLSchema";
/// JavaRosa extension namespace, conventionally bound to the `jr` prefix.
pub const JAVAROSA_NS: &str = "http://openrosa.org/javarosa";

#[derive(Debug, Error)]
pub enum XmlError {
    #[error("xml: {0}")]
    Xml(String),
    #[error("invalid document: {0}")]
    Invalid(String),
    #[error("element nesting exceeds {0} levels")]
    TooDeep(usize),
}

/// A namespace declaration (`xmlns` or `xmlns:prefix`) found on an element.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NamespaceDecl {
    /// `None` for the default namespace.
    pub prefix: Option<String>,
    pub uri: String,
}

/// A plain (non-namespace-declaration) attribute.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Attribute {
    /// Qualified name as written in the document, e.g. `jr:constraintMsg`.
    pub name: String,
    /// Unescaped attribute value.
    pub value: String,
}

impl Attribute {
    /// Attribute name without its prefix.
    pub fn local_name(&self) -> &str {
        local_part(&self.name)
    }
}

/// Owned element node.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Element {
    /// Local tag name (prefix stripped).
    pub name: String,
    pub prefix: Option<String>,
    /// Resolved namespace URI, if the element is bound to one.
    pub namespace: Option<String>,
    pub namespaces: Vec<NamespaceDecl>,
    pub attributes: Vec<Attribute>,
    pub children: Vec<Element>,
    /// Concatenated direct text and CDATA content, if any.
    pub text: Option<String>,
}

impl Element {
    /// Create a bare element with the given local name.
    pub fn new(name: impl Into<String>) -> Self {
        Element {
            name: name.into(),
            ..Element::default()
        }
    }

    /// Builder helper appending an attribute.
    pub fn with_attr(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.push(Attribute {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    /// Builder helper appending a child element.
    pub fn with_child(mut self, child: Element) -> Self {
        self.children.push(child);
        self
    }

    /// Builder helper setting the text content.
    pub fn with_text(mut self, text: impl Into<String>) -> Self {
        self.text = Some(text.into());
        self
    }

    /// Look up an attribute by its qualified name.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.name == name)
            .map(|attr| attr.value.as_str())
    }

    /// Look up an attribute by local name, ignoring any prefix.
    pub fn attr_local(&self, local: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|attr| attr.local_name() == local)
            .map(|attr| attr.value.as_str())
    }

    /// First child element with the given local name.
    pub fn child(&self, name: &str) -> Option<&Element> {
        self.children.iter().find(|child| child.name == name)
    }

    /// All child elements with the given local name, in document order.
    pub fn children_named<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a Element> + 'a {
        self.children.iter().filter(move |child| child.name == name)
    }

    /// First element with the given local name in a depth-first pre-order
    /// search of the subtree, excluding `self`.
    pub fn find_descendant(&self, name: &str) -> Option<&Element> {
        for child in &self.children {
            if child.name == name {
                return Some(child);
            }
            if let Some(found) = child.find_descendant(name) {
                return Some(found);
            }
        }
        None
    }

    /// Text content, or `None` when the element carries no text.
    pub fn text(&self) -> Option<&str> {
        self.text.as_deref()
    }

    pub fn has_children(&self) -> bool {
        !self.children.is_empty()
    }

    /// Namespace URI declared for `prefix` on this element (`None` selects the
    /// default namespace declaration).
    pub fn declared_namespace(&self, prefix: Option<&str>) -> Option<&str> {
        self.namespaces
            .iter()
            .find(|decl| decl.prefix.as_deref() == prefix)
            .map(|decl| decl.uri.as_str())
    }

    /// Whether the element's resolved namespace equals `uri`.
    pub fn in_namespace(&self, uri: &str) -> bool {
        self.namespace.as_deref() == Some(uri)
    }
}

/// Parse an XML document into its root [`Element`].
pub fn parse(xml: &str) -> Result<Element, XmlError> {
    let mut reader = NsReader::from_str(xml);
    reader.trim_text(true);
    let mut buf = Vec::new();
    let mut stack: Vec<Element> = Vec::new();
    let mut root: Option<Element> = None;

    loop {
        match reader.read_resolved_event_into(&mut buf) {
            Ok((ns, Event::Start(e))) => {
                if stack.len() >= MAX_DEPTH {
                    return Err(XmlError::TooDeep(MAX_DEPTH));
                }
                let element = open_element(&e, ns)?;
                trace!(name = %element.name, depth = stack.len(), "open element");
                stack.push(element);
            }
            Ok((ns, Event::Empty(e))) => {
                if stack.len() >= MAX_DEPTH {
                    return Err(XmlError::TooDeep(MAX_DEPTH));
                }
                let element = open_element(&e, ns)?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok((_, Event::End(_))) => {
                let element = stack
                    .pop()
                    .ok_or_else(|| XmlError::Invalid("unbalanced closing tag".into()))?;
                attach(&mut stack, &mut root, element)?;
            }
            Ok((_, Event::Text(t))) => {
                let text = t.unescape().map_err(|err| XmlError::Xml(err.to_string()))?;
                append_text(&mut stack, &text);
            }
            Ok((_, Event::CData(c))) => {
                let bytes = c.into_inner();
                let text = String::from_utf8_lossy(&bytes);
                append_text(&mut stack, &text);
            }
            Ok((_, Event::Eof)) => break,
            Err(err) => return Err(XmlError::Xml(err.to_string())),
            _ => {}
        }
        buf.clear();
    }

    if !stack.is_empty() {
        return Err(XmlError::Invalid(format!(
            "unexpected end of document inside <{}>",
            stack.last().map(|el| el.name.as_str()).unwrap_or_default()
        )));
    }
    root.ok_or_else(|| XmlError::Invalid("document has no root element".into()))
}

fn open_element(event: &BytesStart<'_>, ns: ResolveResult<'_>) -> Result<Element, XmlError> {
    let qname = event.name();
    let name = String::from_utf8_lossy(qname.local_name().as_ref()).into_owned();
    let prefix = qname
        .prefix()
        .map(|p| String::from_utf8_lossy(p.as_ref()).into_owned());
    let namespace = match ns {
        ResolveResult::Bound(Namespace(uri)) => Some(String::from_utf8_lossy(uri).into_owned()),
        _ => None,
    };

    let mut namespaces = Vec::new();
    let mut attributes = Vec::new();
    for attr in event.attributes() {
        let attr = attr.map_err(|err| XmlError::Xml(err.to_string()))?;
        let value = attr
            .unescape_value()
            .map_err(|err| XmlError::Xml(err.to_string()))?
            .into_owned();
        if let Some(binding) = attr.key.as_namespace_binding() {
            let prefix = match binding {
                PrefixDeclaration::Default => None,
                PrefixDeclaration::Named(p) => Some(String::from_utf8_lossy(p).into_owned()),
            };
            namespaces.push(NamespaceDecl { prefix, uri: value });
            continue;
        }
        attributes.push(Attribute {
            name: String::from_utf8_lossy(attr.key.as_ref()).into_owned(),
            value,
        });
    }

    Ok(Element {
        name,
        prefix,
        namespace,
        namespaces,
        attributes,
        children: Vec::new(),
        text: None,
    })
}

fn attach(
    stack: &mut [Element],
    root: &mut Option<Element>,
    element: Element,
) -> Result<(), XmlError> {
    if let Some(parent) = stack.last_mut() {
        parent.children.push(element);
        return Ok(());
    }
    if root.is_some() {
        return Err(XmlError::Invalid(format!(
            "second root element <{}>",
            element.name
        )));
    }
    *root = Some(element);
    Ok(())
}

fn append_text(stack: &mut [Element], text: &str) {
    if text.is_empty() {
        return;
    }
    if let Some(current) = stack.last_mut() {
        match current.text.as_mut() {
            Some(existing) => {
                existing.push(' ');
                existing.push_str(text);
            }
            None => current.text = Some(text.to_string()),
        }
    }
}

fn local_part(name: &str) -> &str {
    match name.split_once(':') {
        Some((_, local)) => local,
        None => name,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FIXTURE: &str = r#"
        <h:html xmlns="http://www.w3.org/2002/xforms"
                xmlns:h="http://www.w3.org/1999/xhtml"
                xmlns:jr="http://openrosa.org/javarosa">
            <h:head>
                <h:title>Survey &amp; Census</h:title>
                <model>
                    <bind nodeset="/data/age" jr:constraintMsg="Too &lt; young" />
                </model>
            </h:head>
            <h:body>
                <input ref="/data/age"><label><![CDATA[Age <years>]]></label></input>
            </h:body>
        </h:html>
    "#;

    #[test]
    fn parse_namespaced_tree() {
        let root = parse(FIXTURE).expect("parse xml");
        assert_eq!(root.name, "html");
        assert_eq!(root.prefix.as_deref(), Some("h"));
        assert!(root.in_namespace(XHTML_NS));
        assert_eq!(root.declared_namespace(None), Some(XFORMS_NS));
        assert_eq!(root.declared_namespace(Some("jr")), Some(JAVAROSA_NS));
        assert!(root.attributes.is_empty(), "xmlns declarations are not attributes");

        let head = root.child("head").expect("head");
        assert!(head.in_namespace(XHTML_NS));
        assert_eq!(head.child("title").and_then(Element::text), Some("Survey & Census"));

        let model = head.child("model").expect("model");
        assert!(model.in_namespace(XFORMS_NS));
        let bind = model.child("bind").expect("bind");
        assert_eq!(bind.attr("nodeset"), Some("/data/age"));
        assert_eq!(bind.attr("jr:constraintMsg"), Some("Too < young"));
        assert_eq!(bind.attr_local("constraintMsg"), Some("Too < young"));

        let label = root.find_descendant("label").expect("label");
        assert_eq!(label.text(), Some("Age <years>"));
    }

    #[test]
    fn rejects_unclosed_document() {
        let err = parse("<a><b></b>").unwrap_err();
        assert!(matches!(err, XmlError::Invalid(_) | XmlError::Xml(_)));
    }

    #[test]
    fn rejects_empty_document() {
        let err = parse("   ").unwrap_err();
        assert!(matches!(err, XmlError::Invalid(_)));
    }

    #[test]
    fn enforces_depth_limit() {
        let xml = format!("{}{}", "<a>".repeat(MAX_DEPTH + 1), "</a>".repeat(MAX_DEPTH + 1));
        let err = parse(&xml).unwrap_err();
        assert!(matches!(err, XmlError::TooDeep(MAX_DEPTH)));
    }

    #[test]
    fn builder_helpers() {
        let el = Element::new("bind")
            .with_attr("nodeset", "/data/a")
            .with_child(Element::new("value").with_text("x"));
        assert_eq!(el.attr("nodeset"), Some("/data/a"));
        assert!(el.has_children());
        assert_eq!(el.children_named("value").count(), 1);
    }
}
