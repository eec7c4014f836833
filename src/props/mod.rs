//! Layered property resolution
//!
//! Every push assembles one flat string-to-string namespace from an ordered
//! list of sources: previous-run outputs, environment overrides, build
//! metadata, and (optionally) the remote variable broker. Later sources win
//! on key collision. The merged namespace feeds both inline template
//! substitution and the typed-parameter path of the provider call.

use anyhow::Result;
use indexmap::IndexMap;

pub mod file;
pub mod sources;

/// One flat, ordered key/value mapping. Nothing nested survives resolution.
pub type PropertyLayer = IndexMap<String, String>;

/// An ordered source of property overrides.
///
/// `Ok(None)` means the source is absent (a local file that does not exist);
/// that is never fatal, the source just contributes nothing. `Err` aborts
/// the push — only the variable broker reports errors this way.
pub trait PropertySource {
    /// Short name used in the build log
    fn name(&self) -> &str;

    /// Produce this source's layer, or None when the source is absent
    fn layer(&self) -> Result<Option<PropertyLayer>>;
}

/// Fold the sources, in declared order, into one namespace.
pub fn resolve(sources: &[&dyn PropertySource]) -> Result<PropertyLayer> {
    let mut merged = PropertyLayer::new();
    for source in sources {
        match source.layer()? {
            Some(layer) => {
                log::debug!("Merging {} properties from {}", layer.len(), source.name());
                for (key, value) in layer {
                    merged.insert(key, value);
                }
            }
            None => {
                crate::ui::info(&format!("No {}", source.name()));
            }
        }
    }
    Ok(merged)
}

/// Replace every literal occurrence of each property key with its value.
///
/// Single pass over the template: substituted values are emitted verbatim
/// and never re-scanned, so a value containing another property's key does
/// not cascade. Overlapping keys resolve to the longest match, independent
/// of layer insertion order. Keys absent from the template are ignored here
/// but stay available for the structured-parameter path.
pub fn substitute(template: &str, properties: &PropertyLayer) -> String {
    let mut rendered = String::with_capacity(template.len());
    let mut rest = template;
    while !rest.is_empty() {
        let hit = properties
            .iter()
            .filter(|(key, _)| !key.is_empty() && rest.starts_with(key.as_str()))
            .max_by_key(|(key, _)| key.len());
        match hit {
            Some((key, value)) => {
                rendered.push_str(value);
                rest = &rest[key.len()..];
            }
            None => {
                let mut chars = rest.chars();
                if let Some(ch) = chars.next() {
                    rendered.push(ch);
                }
                rest = chars.as_str();
            }
        }
    }
    rendered
}

/// The subset of properties whose keys occur literally in the template body.
///
/// Only these are forwarded as typed parameters on the provider call.
pub fn parameters_for(template: &str, properties: &PropertyLayer) -> PropertyLayer {
    properties
        .iter()
        .filter(|(key, _)| template.contains(key.as_str()))
        .map(|(key, value)| (key.clone(), value.clone()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fixed {
        name: &'static str,
        entries: Option<Vec<(&'static str, &'static str)>>,
    }

    impl PropertySource for Fixed {
        fn name(&self) -> &str {
            self.name
        }

        fn layer(&self) -> Result<Option<PropertyLayer>> {
            Ok(self.entries.as_ref().map(|entries| {
                entries
                    .iter()
                    .map(|(k, v)| (k.to_string(), v.to_string()))
                    .collect()
            }))
        }
    }

    #[test]
    fn later_sources_override_earlier_ones() {
        let previous = Fixed {
            name: "previous outputs",
            entries: Some(vec![("DbHost", "old-host"), ("Keep", "yes")]),
        };
        let env = Fixed {
            name: "env overrides",
            entries: Some(vec![("DbHost", "env-host")]),
        };
        let broker = Fixed {
            name: "variable broker",
            entries: Some(vec![("DbHost", "broker-host")]),
        };

        let merged = resolve(&[&previous, &env, &broker]).unwrap();
        assert_eq!(merged.get("DbHost").unwrap(), "broker-host");
        assert_eq!(merged.get("Keep").unwrap(), "yes");
    }

    #[test]
    fn absent_source_contributes_nothing() {
        let missing = Fixed {
            name: "prod.properties",
            entries: None,
        };
        let present = Fixed {
            name: "metadata",
            entries: Some(vec![("BuildId", "BUILD7")]),
        };

        let merged = resolve(&[&missing, &present]).unwrap();
        assert_eq!(merged.len(), 1);
        assert_eq!(merged.get("BuildId").unwrap(), "BUILD7");
    }

    #[test]
    fn failing_source_aborts_resolution() {
        struct Broken;
        impl PropertySource for Broken {
            fn name(&self) -> &str {
                "variable broker"
            }
            fn layer(&self) -> Result<Option<PropertyLayer>> {
                anyhow::bail!("Unable to parse variables")
            }
        }

        assert!(resolve(&[&Broken]).is_err());
    }

    #[test]
    fn substitutes_only_keys_present_in_template() {
        let mut props = PropertyLayer::new();
        props.insert("Cluster".to_string(), "blue".to_string());
        props.insert("Absent".to_string(), "never".to_string());

        let rendered = substitute("cluster=Cluster Cluster", &props);
        assert_eq!(rendered, "cluster=blue blue");
    }

    #[test]
    fn substituted_values_are_never_rescanned() {
        let mut props = PropertyLayer::new();
        props.insert("Endpoint".to_string(), "db.Region.internal".to_string());
        props.insert("Region".to_string(), "us-east-1".to_string());

        // The "Region" inside the substituted Endpoint value stays literal
        let rendered = substitute("host=Endpoint in Region", &props);
        assert_eq!(rendered, "host=db.Region.internal in us-east-1");
    }

    #[test]
    fn overlapping_keys_resolve_to_the_longest_match() {
        let mut first = PropertyLayer::new();
        first.insert("Build".to_string(), "x".to_string());
        first.insert("BuildId".to_string(), "BUILD7".to_string());

        let mut second = PropertyLayer::new();
        second.insert("BuildId".to_string(), "BUILD7".to_string());
        second.insert("Build".to_string(), "x".to_string());

        assert_eq!(substitute("id=BuildId", &first), "id=BUILD7");
        assert_eq!(substitute("id=BuildId", &second), "id=BUILD7");
    }

    #[test]
    fn filters_parameters_to_keys_in_template_body() {
        let mut props = PropertyLayer::new();
        props.insert("DatabasePassword".to_string(), "s3cret".to_string());
        props.insert("UnrelatedKey".to_string(), "x".to_string());

        let template = r#"{"Parameters": {"DatabasePassword": {"Type": "String"}}}"#;
        let params = parameters_for(template, &props);
        assert_eq!(params.len(), 1);
        assert!(params.contains_key("DatabasePassword"));
    }
}
