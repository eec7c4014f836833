//! `key=value` property-file reading and writing
//!
//! The output property file is the only durable state drover owns between
//! pipeline runs. The syntax is the flat Java-style property file the rest
//! of the pipeline already consumes: one `key=value` per line, `#` and `!`
//! comment lines, blank lines ignored, values taken verbatim after the
//! first separator.

use anyhow::{Context, Result};
use std::fs;
use std::path::Path;

use super::PropertyLayer;

/// Parse property-file text into a layer, preserving declaration order.
pub fn parse(content: &str) -> PropertyLayer {
    let mut layer = PropertyLayer::new();
    for line in content.lines() {
        let line = line.trim();
        if line.is_empty() || line.starts_with('#') || line.starts_with('!') {
            continue;
        }
        let Some((key, value)) = split_entry(line) else {
            log::debug!("Skipping malformed property line: {line}");
            continue;
        };
        layer.insert(key.to_string(), value.to_string());
    }
    layer
}

/// A key runs until the first `=` or `:`.
fn split_entry(line: &str) -> Option<(&str, &str)> {
    let sep = line.find(['=', ':'])?;
    let key = line[..sep].trim();
    if key.is_empty() {
        return None;
    }
    Some((key, line[sep + 1..].trim_start()))
}

/// Load a property file, or None when it does not exist.
pub fn load(path: &Path) -> Result<Option<PropertyLayer>> {
    if !path.exists() {
        return Ok(None);
    }
    let content = fs::read_to_string(path)
        .with_context(|| format!("Could not read {}", path.display()))?;
    Ok(Some(parse(&content)))
}

/// Overwrite `path` with the layer in `key=value` form.
pub fn store(path: &Path, layer: &PropertyLayer) -> Result<()> {
    let mut out = format!("# written by drover {}\n", chrono::Utc::now().to_rfc3339());
    for (key, value) in layer {
        out.push_str(key);
        out.push('=');
        out.push_str(value);
        out.push('\n');
    }
    fs::write(path, out).with_context(|| format!("Could not write {}", path.display()))
}
