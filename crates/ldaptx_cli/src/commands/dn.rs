//! Dn command implementation.

use ldaptx_codec::{AvaValue, Dn};
use serde::Serialize;

/// A parsed name.
#[derive(Debug, Serialize)]
pub struct DnReport {
    /// The name as given.
    pub input: String,
    /// The canonical string form.
    pub canonical: String,
    /// Case-folded comparison key.
    pub normalized: String,
    /// Relative names, leaf first.
    pub components: Vec<Vec<AvaReport>>,
}

/// One type/value pair.
#[derive(Debug, Serialize)]
pub struct AvaReport {
    /// Attribute type.
    pub attr_type: String,
    /// The value, hex-encoded if it was given in binary form.
    pub value: String,
    /// Whether the value was given as `#hex`.
    pub binary: bool,
}

/// Parses `text` into a report.
pub fn inspect(text: &str) -> Result<DnReport, Box<dyn std::error::Error>> {
    let dn = Dn::parse(text)?;
    let components = dn
        .rdns()
        .iter()
        .map(|rdn| {
            rdn.avas()
                .iter()
                .map(|ava| match ava.value() {
                    AvaValue::Text(text) => AvaReport {
                        attr_type: ava.attr_type().to_string(),
                        value: text.clone(),
                        binary: false,
                    },
                    AvaValue::Binary(bytes) => AvaReport {
                        attr_type: ava.attr_type().to_string(),
                        value: bytes.iter().map(|b| format!("{b:02x}")).collect(),
                        binary: true,
                    },
                })
                .collect()
        })
        .collect();
    Ok(DnReport {
        input: text.to_string(),
        canonical: dn.to_string(),
        normalized: dn.normalized(),
        components,
    })
}

/// Runs the dn command.
pub fn run(text: &str, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let report = inspect(text)?;
    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&report)?),
        _ => print_text_output(&report),
    }
    Ok(())
}

fn print_text_output(report: &DnReport) {
    println!("Name:       {}", report.canonical);
    println!("Normalized: {}", report.normalized);
    if report.components.is_empty() {
        println!("(root)");
        return;
    }
    for (depth, rdn) in report.components.iter().enumerate() {
        let pairs: Vec<String> = rdn
            .iter()
            .map(|ava| {
                if ava.binary {
                    format!("{} = #{}", ava.attr_type, ava.value)
                } else {
                    format!("{} = {:?}", ava.attr_type, ava.value)
                }
            })
            .collect();
        println!("  [{depth}] {}", pairs.join(" + "));
    }
}
