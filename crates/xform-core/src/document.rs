use xform_xml::{Element, EVENTS_NS, JAVAROSA_NS, XFORMS_NS, XHTML_NS, XSD_NS};

use crate::FormError;

/// Namespace declarations every form root must carry, as `(prefix, uri)`.
const REQUIRED_NAMESPACES: [(Option<&str>, &str); 5] = [
    (None, XFORMS_NS),
    (Some("h"), XHTML_NS),
    (Some("ev"), EVENTS_NS),
    (Some("xsd"), XSD_NS),
    (Some("jr"), JAVAROSA_NS),
];

/// The `head` and `body` sections of a schema-checked form document.
#[derive(Debug, Clone, Copy)]
pub struct FormDocument<'a> {
    pub root: &'a Element,
    pub head: &'a Element,
    pub body: &'a Element,
}

impl<'a> FormDocument<'a> {
    /// Check the root element and locate its sections.
    pub fn locate(root: &'a Element) -> Result<Self, FormError> {
        if root.name != "html" || !root.in_namespace(XHTML_NS) {
            return Err(FormError::Schema(format!(
                "root element must be html in {XHTML_NS}, found <{}>",
                root.name
            )));
        }
        for (prefix, uri) in REQUIRED_NAMESPACES {
            if root.declared_namespace(prefix) != Some(uri) {
                let attr = match prefix {
                    Some(prefix) => format!("xmlns:{prefix}"),
                    None => "xmlns".to_string(),
                };
                return Err(FormError::Schema(format!(
                    "root element must declare {attr}=\"{uri}\""
                )));
            }
        }
        Ok(FormDocument {
            root,
            head: single_section(root, "head")?,
            body: single_section(root, "body")?,
        })
    }
}

fn single_section<'a>(root: &'a Element, name: &str) -> Result<&'a Element, FormError> {
    let mut sections = root
        .children
        .iter()
        .filter(|child| child.name == name && child.in_namespace(XHTML_NS));
    match (sections.next(), sections.next()) {
        (Some(section), None) => Ok(section),
        (None, _) => Err(FormError::Schema(format!("missing h:{name} element"))),
        (Some(_), Some(_)) => Err(FormError::Schema(format!("more than one h:{name} element"))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAMESPACES: &str = r#"xmlns="http://www.w3.org/2002/xforms" xmlns:h="http://www.w3.org/1999/xhtml" xmlns:ev="http://www.w3.org/2001/xml-events" xmlns:xsd="http://www.w3.org/2001/XMLSchema" xmlns:jr="http://openrosa.org/javarosa""#;

    fn locate(xml: &str) -> Result<(), FormError> {
        let root = xform_xml::parse(xml).expect("parse xml");
        FormDocument::locate(&root).map(|_| ())
    }

    #[test]
    fn accepts_well_formed_root() {
        let xml = format!("<h:html {NAMESPACES}><h:head/><h:body/></h:html>");
        let root = xform_xml::parse(&xml).expect("parse xml");
        let doc = FormDocument::locate(&root).expect("locate sections");
        assert_eq!(doc.head.name, "head");
        assert_eq!(doc.body.name, "body");
    }

    #[test]
    fn rejects_wrong_root() {
        let xml = format!("<h:form {NAMESPACES}><h:head/><h:body/></h:form>");
        assert!(matches!(locate(&xml), Err(FormError::Schema(_))));
    }

    #[test]
    fn rejects_missing_namespace() {
        let xml = r#"<h:html xmlns="http://www.w3.org/2002/xforms" xmlns:h="http://www.w3.org/1999/xhtml"><h:head/><h:body/></h:html>"#;
        let err = locate(xml).unwrap_err();
        assert!(err.to_string().contains("xmlns:ev"), "{err}");
    }

    #[test]
    fn rejects_missing_or_duplicate_sections() {
        let xml = format!("<h:html {NAMESPACES}><h:head/></h:html>");
        assert!(matches!(locate(&xml), Err(FormError::Schema(_))));
        let xml = format!("<h:html {NAMESPACES}><h:head/><h:body/><h:body/></h:html>");
        assert!(matches!(locate(&xml), Err(FormError::Schema(_))));
        let xml = format!("<h:html {NAMESPACES}><head/><h:body/></h:html>");
        assert!(matches!(locate(&xml), Err(FormError::Schema(_))));
    }
}
