//! BloodHound JSON output
//!
//! Emits the object wrapper BloodHound ingests:
//! `{meta: {type, version: 4, count, collectiontime}, data: [...]}`.
//! The object type is auto-detected per batch by majority vote over
//! objectClass (priority: computer > user > group), with DN inspection as
//! the fallback when objectClass was not projected.

use std::io::Write;

use anyhow::Result;
use chrono::Utc;
use ldap3::SearchEntry;
use serde_json::{json, Map, Value};
use tokio::sync::mpsc;

use crate::decode::{attr_value, attr_values};
use crate::identity::parse_object_sid;
use crate::uac::UAC_ACCOUNT_DISABLE;

use super::{extract_domain, object_type_from_dn, open_writer, PrinterConfig};

/// BloodHound data format version
const BLOODHOUND_VERSION: u32 = 4;

pub struct BloodHoundPrinter {
    config: PrinterConfig,
}

impl BloodHoundPrinter {
    pub fn new(config: PrinterConfig) -> Self {
        BloodHoundPrinter { config }
    }

    pub fn print(&self, entries: &[SearchEntry]) -> Result<()> {
        let object_type = auto_detect_object_type(entries);

        let data: Vec<Value> = entries
            .iter()
            .map(|entry| convert_entry(entry, object_type))
            .collect();

        let output = json!({
            "meta": {
                "type": object_type,
                "version": BLOODHOUND_VERSION,
                "count": data.len(),
                "collectiontime": Utc::now().format("%Y-%m-%dT%H:%M:%SZ").to_string(),
            },
            "data": data,
        });

        let mut w = open_writer(&self.config.path)?;
        serde_json::to_writer_pretty(&mut w, &output)?;
        writeln!(w)?;
        Ok(())
    }

    /// BloodHound metadata needs the final count and type, so streaming
    /// collects first and renders once the channel closes.
    pub async fn stream_print(&self, mut entries: mpsc::Receiver<SearchEntry>) -> Result<()> {
        let mut collected = Vec::new();
        while let Some(entry) = entries.recv().await {
            collected.push(entry);
        }
        self.print(&collected)
    }
}

/// Majority vote over per-entry classification
fn auto_detect_object_type(entries: &[SearchEntry]) -> &'static str {
    let mut users = 0usize;
    let mut computers = 0usize;
    let mut groups = 0usize;

    for entry in entries {
        let classes = attr_values(entry, "objectClass");
        if !classes.is_empty() {
            // objectClass is multi-valued; computer implies user, so the
            // priority order matters
            if classes.iter().any(|c| c == "computer") {
                computers += 1;
            } else if classes.iter().any(|c| c == "user") {
                users += 1;
            } else if classes.iter().any(|c| c == "group") {
                groups += 1;
            }
        } else {
            match object_type_from_dn(&entry.dn) {
                "DC" | "COMPUTER" => computers += 1,
                "USER" => users += 1,
                "GROUP" => groups += 1,
                _ => {}
            }
        }
    }

    let mut detected = "users";
    let mut max = users;
    if computers > max {
        detected = "computers";
        max = computers;
    }
    if groups > max {
        detected = "groups";
    }
    detected
}

fn convert_entry(entry: &SearchEntry, object_type: &str) -> Value {
    match object_type {
        "users" => convert_user(entry),
        "computers" => convert_computer(entry),
        "groups" => convert_group(entry),
        _ => convert_generic(entry),
    }
}

fn is_enabled(entry: &SearchEntry) -> bool {
    let uac = attr_value(entry, "userAccountControl");
    if uac.is_empty() {
        return true;
    }
    match uac.parse::<u32>() {
        Ok(value) => value & UAC_ACCOUNT_DISABLE == 0,
        Err(_) => true,
    }
}

fn sid_string(entry: &SearchEntry) -> String {
    let raw = crate::decode::raw_attr_value(entry, "objectSid");
    if raw.is_empty() {
        return String::new();
    }
    parse_object_sid(raw).unwrap_or_default()
}

fn convert_user(entry: &SearchEntry) -> Value {
    let spns = attr_values(entry, "servicePrincipalName");

    json!({
        "ObjectIdentifier": entry.dn,
        "Properties": {
            "name": attr_value(entry, "sAMAccountName"),
            "domain": extract_domain(&entry.dn),
            "enabled": is_enabled(entry),
            "hasspn": !spns.is_empty(),
            "serviceprincipalnames": spns,
            "admincount": attr_value(entry, "adminCount").parse::<i64>().unwrap_or(0),
            "sid": sid_string(entry),
            "whencreated": attr_value(entry, "whenCreated"),
        },
    })
}

fn convert_computer(entry: &SearchEntry) -> Value {
    json!({
        "ObjectIdentifier": entry.dn,
        "Properties": {
            "name": attr_value(entry, "sAMAccountName"),
            "domain": extract_domain(&entry.dn),
            "enabled": is_enabled(entry),
            "operatingsystem": attr_value(entry, "operatingSystem"),
            "osversion": attr_value(entry, "operatingSystemVersion"),
            "sid": sid_string(entry),
            "whencreated": attr_value(entry, "whenCreated"),
        },
    })
}

fn convert_group(entry: &SearchEntry) -> Value {
    let members = attr_values(entry, "member");

    json!({
        "ObjectIdentifier": entry.dn,
        "Properties": {
            "name": attr_value(entry, "sAMAccountName"),
            "domain": extract_domain(&entry.dn),
            "enabled": true,
            "membercount": members.len(),
            "sid": sid_string(entry),
            "whencreated": attr_value(entry, "whenCreated"),
        },
        "Members": members,
    })
}

fn convert_generic(entry: &SearchEntry) -> Value {
    let mut properties = Map::new();
    properties.insert(
        "name".to_string(),
        Value::String(attr_value(entry, "sAMAccountName").to_string()),
    );
    properties.insert(
        "domain".to_string(),
        Value::String(extract_domain(&entry.dn)),
    );

    for (name, values) in &entry.attrs {
        let value = match values.len() {
            0 => continue,
            1 => Value::String(values[0].clone()),
            _ => Value::Array(values.iter().map(|v| Value::String(v.clone())).collect()),
        };
        properties.insert(name.clone(), value);
    }

    json!({
        "ObjectIdentifier": entry.dn,
        "Properties": properties,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn entry(dn: &str, classes: &[&str], extra: Vec<(&str, Vec<&str>)>) -> SearchEntry {
        let mut attrs: HashMap<String, Vec<String>> = HashMap::new();
        if !classes.is_empty() {
            attrs.insert(
                "objectClass".to_string(),
                classes.iter().map(|s| s.to_string()).collect(),
            );
        }
        for (k, v) in extra {
            attrs.insert(k.to_string(), v.into_iter().map(String::from).collect());
        }
        SearchEntry {
            dn: dn.to_string(),
            attrs,
            bin_attrs: HashMap::new(),
        }
    }

    #[test]
    fn test_auto_detect_computer_beats_user() {
        // A computer entry carries both "user" and "computer" classes
        let entries = vec![entry(
            "CN=WS01,CN=Computers,DC=corp,DC=com",
            &["top", "person", "organizationalPerson", "user", "computer"],
            vec![],
        )];
        assert_eq!(auto_detect_object_type(&entries), "computers");
    }

    #[test]
    fn test_auto_detect_majority() {
        let entries = vec![
            entry("CN=a,CN=Users,DC=c,DC=l", &["user"], vec![]),
            entry("CN=b,CN=Users,DC=c,DC=l", &["user"], vec![]),
            entry("CN=g,CN=Users,DC=c,DC=l", &["group"], vec![]),
        ];
        assert_eq!(auto_detect_object_type(&entries), "users");
    }

    #[test]
    fn test_auto_detect_dn_fallback() {
        let entries = vec![entry("CN=WS01,CN=Computers,DC=corp,DC=com", &[], vec![])];
        assert_eq!(auto_detect_object_type(&entries), "computers");
    }

    #[test]
    fn test_auto_detect_empty_defaults_to_users() {
        assert_eq!(auto_detect_object_type(&[]), "users");
    }

    #[test]
    fn test_meta_wrapper_shape() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bh.json");
        let printer = BloodHoundPrinter::new(PrinterConfig {
            format: crate::config::OutputFormat::BloodHound,
            path: Some(path.clone()),
        });

        printer
            .print(&[entry(
                "CN=alice,CN=Users,DC=corp,DC=example,DC=com",
                &["top", "person", "user"],
                vec![
                    ("sAMAccountName", vec!["alice"]),
                    ("userAccountControl", vec!["512"]),
                ],
            )])
            .unwrap();

        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(parsed["meta"]["type"], "users");
        assert_eq!(parsed["meta"]["version"], 4);
        assert_eq!(parsed["meta"]["count"], 1);
        // ISO-8601 UTC with trailing Z
        let ts = parsed["meta"]["collectiontime"].as_str().unwrap();
        assert!(ts.ends_with('Z') && ts.len() == 20);
        assert_eq!(parsed["data"][0]["Properties"]["name"], "alice");
        assert_eq!(parsed["data"][0]["Properties"]["enabled"], true);
        assert_eq!(
            parsed["data"][0]["Properties"]["domain"],
            "corp.example.com"
        );
    }

    #[test]
    fn test_disabled_user_enabled_flag() {
        let e = entry(
            "CN=old,CN=Users,DC=corp,DC=com",
            &["user"],
            vec![("userAccountControl", vec!["514"])],
        );
        assert!(!is_enabled(&e));
    }

    #[tokio::test]
    async fn test_stream_collects_then_renders() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bh.json");
        let printer = BloodHoundPrinter::new(PrinterConfig {
            format: crate::config::OutputFormat::BloodHound,
            path: Some(path.clone()),
        });

        let (tx, rx) = mpsc::channel(4);
        tx.send(entry(
            "CN=g1,OU=Groups,DC=corp,DC=com",
            &["group"],
            vec![("member", vec!["CN=alice,CN=Users,DC=corp,DC=com"])],
        ))
        .await
        .unwrap();
        drop(tx);

        printer.stream_print(rx).await.unwrap();

        let parsed: serde_json::Value =
            serde_json::from_str(&std::fs::read_to_string(path).unwrap()).unwrap();
        assert_eq!(parsed["meta"]["type"], "groups");
        assert_eq!(parsed["data"][0]["Members"].as_array().unwrap().len(), 1);
    }
}
