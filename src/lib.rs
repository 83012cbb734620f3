//! Aggregator for the XForm crates.
//!
//! ```
//! use xform_rs::core::{FormControl, FormModel};
//!
//! let xml = r#"
//!     <h:html xmlns="http://www.w3.org/2002/xforms"
//!             xmlns:h="http://www.w3.org/1999/xhtml"
//!             xmlns:ev="http://www.w3.org/2001/xml-events"
//!             xmlns:xsd="http://www.w3.org/2001/XMLSchema"
//!             xmlns:jr="http://openrosa.org/javarosa">
//!         <h:head>
//!             <model>
//!                 <instance><data id="demo"><name/></data></instance>
//!                 <bind nodeset="/data/name" required="true()"/>
//!             </model>
//!         </h:head>
//!         <h:body>
//!             <input ref="/data/name"><label>Name</label></input>
//!         </h:body>
//!     </h:html>"#;
//!
//! let model = FormModel::parse(xml)?;
//! let name = model.find_control("/data/name").expect("name control");
//! assert!(name.is_required(model.fields()));
//! assert_eq!(name.label_text(model.translations(), None), "Name");
//! # Ok::<(), xform_rs::core::FormError>(())
//! ```

pub use xform_core as core;
pub use xform_xml as xml;
