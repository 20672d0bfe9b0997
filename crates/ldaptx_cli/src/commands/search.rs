//! Search command implementation.

use ldaptx_codec::{Dn, Entry, Filter, Scope};
use ldaptx_core::Directory;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::Path;

/// Arguments of one search.
#[derive(Debug, Clone)]
pub struct SearchArgs {
    /// Search base; falls back to the configured default.
    pub base: Option<String>,
    /// Scope name.
    pub scope: String,
    /// Filter text.
    pub filter: String,
    /// Attributes to return.
    pub attributes: Vec<String>,
    /// Entry cap.
    pub limit: Option<usize>,
}

/// One entry of the output.
#[derive(Debug, Serialize)]
pub struct EntryOutput {
    /// Entry name.
    pub dn: String,
    /// Attribute values, non-UTF-8 values rendered lossily.
    pub attributes: BTreeMap<String, Vec<String>>,
}

impl From<&Entry> for EntryOutput {
    fn from(entry: &Entry) -> Self {
        let attributes = entry
            .attributes
            .iter()
            .map(|(name, vals)| {
                let rendered = vals
                    .iter()
                    .map(|v| String::from_utf8_lossy(v).into_owned())
                    .collect();
                (name.to_string(), rendered)
            })
            .collect();
        Self {
            dn: entry.dn.to_string(),
            attributes,
        }
    }
}

/// Runs `args` against `dir`.
pub fn execute(
    dir: &mut Directory,
    default_base: Option<&str>,
    args: &SearchArgs,
) -> Result<Vec<EntryOutput>, Box<dyn std::error::Error>> {
    let base_text = args
        .base
        .as_deref()
        .or(default_base)
        .ok_or("No search base given and none configured")?;
    let base = Dn::parse(base_text)?;
    let scope: Scope = args.scope.parse()?;
    let filter = Filter::parse(&args.filter)?;
    let attributes: Vec<&str> = args.attributes.iter().map(String::as_str).collect();
    let results = dir.search(&base, scope, &filter, &attributes, args.limit)?;
    Ok(results.map(|entry| EntryOutput::from(&entry)).collect())
}

/// Runs the search command.
pub fn run(config: &Path, args: &SearchArgs, format: &str) -> Result<(), Box<dyn std::error::Error>> {
    let (conn, settings) = super::connect(config)?;
    let mut dir = Directory::new(conn);
    let entries = execute(&mut dir, settings.base_dn.as_deref(), args)?;

    match format {
        "json" => println!("{}", serde_json::to_string_pretty(&entries)?),
        _ => print_text_output(&entries),
    }
    Ok(())
}

fn print_text_output(entries: &[EntryOutput]) {
    for entry in entries {
        println!("dn: {}", entry.dn);
        for (name, vals) in &entry.attributes {
            for value in vals {
                println!("{name}: {value}");
            }
        }
        println!();
    }
    println!("# {} entries", entries.len());
}

#[cfg(test)]
mod tests {
    use super::*;
    use ldaptx_testkit::{TestDirectory, BASE, PEOPLE};

    fn args(base: Option<&str>, scope: &str, filter: &str) -> SearchArgs {
        SearchArgs {
            base: base.map(String::from),
            scope: scope.to_string(),
            filter: filter.to_string(),
            attributes: vec!["uid".to_string()],
            limit: None,
        }
    }

    #[test]
    fn finds_people() {
        let mut test_dir = TestDirectory::new();
        let found = execute(&mut test_dir, None, &args(Some(PEOPLE), "one", "(uid=tux)")).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].attributes["uid"], vec!["tux"]);
        assert!(!found[0].attributes.contains_key("sn"));
    }

    #[test]
    fn falls_back_to_configured_base() {
        let mut test_dir = TestDirectory::new();
        let found = execute(&mut test_dir, Some(BASE), &args(None, "sub", "(uid=*)")).unwrap();
        assert_eq!(found.len(), 1);
    }

    #[test]
    fn missing_base_is_an_error() {
        let mut test_dir = TestDirectory::new();
        assert!(execute(&mut test_dir, None, &args(None, "sub", "(uid=*)")).is_err());
    }

    #[test]
    fn bad_scope_is_an_error() {
        let mut test_dir = TestDirectory::new();
        assert!(execute(&mut test_dir, None, &args(Some(BASE), "deep", "(uid=*)")).is_err());
    }
}
