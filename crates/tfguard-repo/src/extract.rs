//! Resource extraction from JSON documents.
//!
//! Accepted shapes:
//! - Terraform plan JSON (`planned_values.root_module`)
//! - Terraform state JSON (`values.root_module`)
//! - the native model: `{ "resources": [ { "type", "name", "address"?, "attributes" } ] }`

use anyhow::{Context, bail};
use serde_json::{Map, Value};
use tfguard_domain::Resource;
use tfguard_types::{Location, RepoPath};

/// Turns the text of one resource file into resources.
pub trait ResourceExtractor: Send + Sync {
    fn extract(&self, path: &RepoPath, text: &str) -> anyhow::Result<Vec<Resource>>;
}

/// Default extractor for plan, state and native JSON documents.
#[derive(Clone, Copy, Debug, Default)]
pub struct PlanJsonExtractor;

impl ResourceExtractor for PlanJsonExtractor {
    fn extract(&self, path: &RepoPath, text: &str) -> anyhow::Result<Vec<Resource>> {
        let doc: Value = serde_json::from_str(text).with_context(|| format!("parse JSON {path}"))?;

        let mut resources = Vec::new();
        if let Some(root) = doc.pointer("/planned_values/root_module") {
            walk_module(root, &mut resources).with_context(|| format!("read plan {path}"))?;
        } else if let Some(root) = doc.pointer("/values/root_module") {
            walk_module(root, &mut resources).with_context(|| format!("read state {path}"))?;
        } else if let Some(list) = doc.get("resources").and_then(Value::as_array) {
            for (i, item) in list.iter().enumerate() {
                let resource = native_resource(item)
                    .with_context(|| format!("{path}: resources[{i}]"))?;
                resources.push(resource);
            }
        } else if doc.get("format_version").is_some() {
            // A plan with no planned changes and no prior state.
        } else {
            bail!(
                "{path}: unrecognized resource document (expected planned_values, values or resources)"
            );
        }

        for resource in &mut resources {
            resource.location = Some(Location {
                path: path.clone(),
                line: address_line(text, &resource.address),
            });
        }
        Ok(resources)
    }
}

fn walk_module(module: &Value, out: &mut Vec<Resource>) -> anyhow::Result<()> {
    if let Some(list) = module.get("resources").and_then(Value::as_array) {
        for item in list {
            let mode = item.get("mode").and_then(Value::as_str).unwrap_or("managed");
            if mode != "managed" {
                continue;
            }
            let resource_type = str_field(item, "type")?;
            let name = str_field(item, "name")?;
            let attributes = item.get("values").cloned().unwrap_or(Value::Object(Map::new()));
            let mut resource = Resource::new(resource_type, name, attributes);
            if let Some(address) = item.get("address").and_then(Value::as_str) {
                resource = resource.with_address(address);
            }
            out.push(resource);
        }
    }
    if let Some(children) = module.get("child_modules").and_then(Value::as_array) {
        for child in children {
            walk_module(child, out)?;
        }
    }
    Ok(())
}

fn native_resource(item: &Value) -> anyhow::Result<Resource> {
    let resource_type = str_field(item, "type")?;
    let name = str_field(item, "name")?;
    let attributes = item
        .get("attributes")
        .cloned()
        .unwrap_or(Value::Object(Map::new()));
    let mut resource = Resource::new(resource_type, name, attributes);
    if let Some(address) = item.get("address").and_then(Value::as_str) {
        resource = resource.with_address(address);
    }
    Ok(resource)
}

fn str_field<'a>(item: &'a Value, key: &str) -> anyhow::Result<&'a str> {
    match item.get(key).and_then(Value::as_str) {
        Some(s) if !s.is_empty() => Ok(s),
        _ => bail!("resource entry is missing a non-empty \"{key}\""),
    }
}

/// 1-based line of the first `"address": "<address>"` pair in `text`.
fn address_line(text: &str, address: &str) -> Option<u32> {
    let needle = serde_json::to_string(address).ok()?;
    let mut from = 0;
    while let Some(found) = text[from..].find(&needle) {
        let at = from + found;
        let before = text[..at].trim_end();
        if let Some(key) = before.strip_suffix(':')
            && key.trim_end().ends_with("\"address\"")
        {
            return Some(byte_offset_to_line(text, at));
        }
        from = at + needle.len();
    }
    None
}

/// Calculate the 1-based line number from a byte offset in the source text.
fn byte_offset_to_line(source: &str, offset: usize) -> u32 {
    let line_count = source[..offset.min(source.len())]
        .bytes()
        .filter(|b| *b == b'\n')
        .count();
    (line_count + 1) as u32
}
