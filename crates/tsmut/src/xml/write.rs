//! Document writer.

use crate::model::TransitionSystem;

/// Render a model as an unqualified `<ts>` document.
pub fn to_xml(system: &TransitionSystem) -> String {
    let mut xml = String::new();
    xml.push_str(r#"<?xml version="1.0" encoding="UTF-8"?>"#);
    xml.push('\n');
    xml.push_str("<ts>\n");
    xml.push_str(&format!("    <start>{}</start>\n", escape_xml(system.start())));
    xml.push_str("    <states>\n");

    for state in system.states() {
        if state.is_terminal() {
            xml.push_str(&format!("        <state id=\"{}\"/>\n", escape_xml(&state.id)));
            continue;
        }
        xml.push_str(&format!("        <state id=\"{}\">\n", escape_xml(&state.id)));
        for transition in &state.transitions {
            xml.push_str(&format!(
                "            <transition action=\"{}\" target=\"{}\"/>\n",
                escape_xml(&transition.action),
                escape_xml(&transition.target)
            ));
        }
        xml.push_str("        </state>\n");
    }

    xml.push_str("    </states>\n");
    xml.push_str("</ts>\n");
    xml
}

/// Escape XML special characters
fn escape_xml(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&apos;")
}
