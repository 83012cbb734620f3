use std::env;
use std::error::Error;
use std::fs;

use tracing_subscriber::EnvFilter;
use xform_core::{ControlNode, FormControl, FormModel};

const SAMPLE: &str = r#"
    <h:html xmlns="http://www.w3.org/2002/xforms"
            xmlns:h="http://www.w3.org/1999/xhtml"
            xmlns:ev="http://www.w3.org/2001/xml-events"
            xmlns:xsd="http://www.w3.org/2001/XMLSchema"
            xmlns:jr="http://openrosa.org/javarosa">
        <h:head>
            <h:title>Clinic visit</h:title>
            <model>
                <instance>
                    <visit id="clinic_visit">
                        <patient/>
                        <fever>no</fever>
                        <temperature/>
                        <symptoms/>
                    </visit>
                </instance>
                <bind nodeset="/visit/patient" required="true()"/>
                <bind nodeset="/visit/temperature" type="decimal"
                      relevant="selected(../fever, 'yes')"
                      constraint=". &gt;= 35 and . &lt;= 43" jr:constraintMsg="Out of range"/>
                <itext>
                    <translation lang="en">
                        <text id="patient"><value>Patient name</value></text>
                    </translation>
                    <translation lang="sw">
                        <text id="patient"><value>Jina la mgonjwa</value></text>
                    </translation>
                </itext>
            </model>
        </h:head>
        <h:body>
            <input ref="/visit/patient"><label ref="jr:itext('patient')"/></input>
            <select1 ref="/visit/fever">
                <label>Fever?</label>
                <item><label>Yes</label><value>yes</value></item>
                <item><label>No</label><value>no</value></item>
            </select1>
            <input ref="/visit/temperature"><label>Temperature</label></input>
            <select ref="/visit/symptoms">
                <label>Symptoms</label>
                <item><label>Cough</label><value>cough</value></item>
                <item><label>Rash</label><value>rash</value></item>
            </select>
        </h:body>
    </h:html>
"#;

fn main() -> Result<(), Box<dyn Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_target(false)
        .init();

    let xml = match env::args().nth(1) {
        Some(path) => fs::read_to_string(path)?,
        None => SAMPLE.to_string(),
    };
    let model = FormModel::parse(&xml)?;

    println!(
        "{} ({})",
        model.title().unwrap_or("untitled"),
        model.form_id().unwrap_or("-")
    );
    for field in model.fields().iter().filter(|f| !f.is_container) {
        println!("  field {} : {}", field.path, field.field_type);
        if let Some(relevant) = &field.relevant {
            for path in relevant
                .condition
                .terms()
                .flat_map(|term| term.referenced_paths())
            {
                if let Some(control) = model.find_control(path) {
                    println!("    shown when {} ({})", relevant.condition, control.node_type());
                }
            }
        }
    }

    for lang in model.translations().languages() {
        println!("[{lang}]");
        for node in model.controls() {
            if let ControlNode::Control(control) = node {
                println!(
                    "  {:<24} {}",
                    control.label_text(model.translations(), Some(lang)),
                    control.element_name().unwrap_or_default()
                );
            }
        }
    }

    for diagnostic in model.diagnostics() {
        eprintln!("warning: {diagnostic}");
    }
    Ok(())
}
