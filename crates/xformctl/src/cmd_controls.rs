use std::path::Path;

use anyhow::Result;
use tracing::info;
use xform_core::{ControlNode, FieldMap, FormControl, TranslationTable};

use crate::common;

pub fn run(file: &Path, lang: Option<&str>, json: bool) -> Result<()> {
    let model = common::load_model(file)?;
    info!(
        top_level = model.controls().len(),
        leaves = model.flat_controls().len(),
        "built control tree"
    );

    if json {
        common::print_json(&model.controls())?;
        return Ok(());
    }

    let view = TreeView {
        fields: model.fields(),
        translations: model.translations(),
        lang,
    };
    for node in model.controls() {
        view.print(node, 0);
    }
    Ok(())
}

struct TreeView<'a> {
    fields: &'a FieldMap,
    translations: &'a TranslationTable,
    lang: Option<&'a str>,
}

impl TreeView<'_> {
    fn print(&self, node: &ControlNode, depth: usize) {
        let indent = "  ".repeat(depth);
        let label = node.label_text(self.translations, self.lang);
        let required = if node.is_required(self.fields) { " *" } else { "" };
        match node {
            ControlNode::Control(control) => {
                let kind = match (control.node_type(), control.multiple) {
                    ("select", true) => "select (multiple)",
                    (kind, _) => kind,
                };
                println!(
                    "{indent}{kind} {}{required}  {}",
                    common::or_dash(FormControl::path(control)),
                    label
                );
                for option in &control.children {
                    let text = self.translations.get_text(option.label.as_ref(), self.lang);
                    println!("{indent}    [{}] {text}", option.value);
                }
                if let Some(item_set) = &control.item_set {
                    println!("{indent}    itemset {item_set}");
                }
            }
            ControlNode::Group(group) => {
                let kind = if group.is_repeat { "repeat group" } else { "group" };
                println!(
                    "{indent}{kind} {}  {}",
                    common::or_dash(FormControl::path(group)),
                    label
                );
                for child in &group.list {
                    self.print(child, depth + 1);
                }
            }
        }
    }
}
