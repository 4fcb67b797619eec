// SPDX-License-Identifier: MIT OR Apache-2.0
//! Declarative property mapping for portal schemas.
//!
//! Municipal portals never agree on attribute names: one publishes
//! `DISTRICT`, the next `ward_num`, a third splits the GEOID across two
//! columns. A [`FieldMapper`] is a small declarative program — loaded from
//! JSON config — that rewrites a record's properties into the canonical
//! `{GEOID, NAME, STATEFP, ...}` schema before transformation.
//!
//! Unmappable records are either skipped (soft mode) or fail the whole
//! transform (strict mode); the provider declares which.

use atlas_core::{AtlasError, AtlasResult};
use regex_lite::Regex;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// What to do with a record the rules cannot map.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MapperMode {
    /// Skip the record and keep going.
    Soft,
    /// Fail the transform.
    Strict,
}

/// One mapping operation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "kebab-case")]
pub enum MapRule {
    /// Move a property to a new name.
    Rename {
        /// Source property.
        from: String,
        /// Destination property.
        to: String,
    },
    /// Join several properties into one.
    Concat {
        /// Source properties, in order.
        fields: Vec<String>,
        /// Separator between values.
        #[serde(default)]
        separator: String,
        /// Destination property.
        to: String,
    },
    /// Take a character range of a string property.
    Substring {
        /// Source property.
        field: String,
        /// Zero-based start offset.
        start: usize,
        /// Length; omitted means "to the end".
        #[serde(default)]
        len: Option<usize>,
        /// Destination property.
        to: String,
    },
    /// Capture group 1 of a regex applied to a string property.
    ExtractRegex {
        /// Source property.
        field: String,
        /// Pattern with at least one capture group.
        pattern: String,
        /// Destination property.
        to: String,
    },
    /// Insert a value when the property is missing or null.
    Default {
        /// Target property.
        field: String,
        /// Value to insert.
        value: Value,
    },
    /// Fail the record when the property is missing or empty.
    Require {
        /// Target property.
        field: String,
    },
    /// Trim surrounding whitespace from a string property.
    NormalizeTrim {
        /// Target property.
        field: String,
    },
}

/// A compiled mapping program.
#[derive(Debug)]
pub struct FieldMapper {
    rules: Vec<MapRule>,
    mode: MapperMode,
    patterns: HashMap<String, Regex>,
}

/// On-disk mapper config shape.
#[derive(Debug, Serialize, Deserialize)]
struct MapperConfig {
    mode: MapperMode,
    rules: Vec<MapRule>,
}

impl FieldMapper {
    /// Build a mapper from rules, pre-compiling every regex.
    ///
    /// # Errors
    ///
    /// Returns [`AtlasError::Format`] for an uncompilable pattern.
    pub fn new(rules: Vec<MapRule>, mode: MapperMode) -> AtlasResult<Self> {
        let mut patterns = HashMap::new();
        for rule in &rules {
            if let MapRule::ExtractRegex { pattern, .. } = rule {
                let compiled = Regex::new(pattern).map_err(|e| AtlasError::Format {
                    provider: "mapper".into(),
                    reason: format!("bad pattern `{pattern}`: {e}"),
                })?;
                patterns.insert(pattern.clone(), compiled);
            }
        }
        Ok(Self {
            rules,
            mode,
            patterns,
        })
    }

    /// Parse a mapper from its JSON config document.
    ///
    /// # Errors
    ///
    /// Returns [`AtlasError::Format`] for malformed JSON or patterns.
    pub fn from_json(config: &str) -> AtlasResult<Self> {
        let parsed: MapperConfig =
            serde_json::from_str(config).map_err(|e| AtlasError::Format {
                provider: "mapper".into(),
                reason: format!("mapper config: {e}"),
            })?;
        Self::new(parsed.rules, parsed.mode)
    }

    /// The configured failure mode.
    #[must_use]
    pub fn mode(&self) -> MapperMode {
        self.mode
    }

    /// Apply the program to one record's properties.
    ///
    /// Returns `Ok(None)` for a soft-skipped record.
    ///
    /// # Errors
    ///
    /// In strict mode an unmappable record fails with
    /// [`AtlasError::Schema`].
    pub fn apply(&self, properties: &Map<String, Value>) -> AtlasResult<Option<Map<String, Value>>> {
        match self.apply_inner(properties) {
            Ok(mapped) => Ok(Some(mapped)),
            Err(err) => match self.mode {
                MapperMode::Soft => Ok(None),
                MapperMode::Strict => Err(err),
            },
        }
    }

    fn apply_inner(&self, properties: &Map<String, Value>) -> AtlasResult<Map<String, Value>> {
        let mut record = properties.clone();
        for rule in &self.rules {
            self.apply_rule(rule, &mut record)?;
        }
        Ok(record)
    }

    fn apply_rule(&self, rule: &MapRule, record: &mut Map<String, Value>) -> AtlasResult<()> {
        match rule {
            MapRule::Rename { from, to } => {
                let value = record.remove(from).ok_or_else(|| missing(from))?;
                record.insert(to.clone(), value);
            }
            MapRule::Concat {
                fields,
                separator,
                to,
            } => {
                let parts: Vec<String> = fields
                    .iter()
                    .map(|f| record.get(f).map(stringify).ok_or_else(|| missing(f)))
                    .collect::<AtlasResult<_>>()?;
                record.insert(to.clone(), Value::String(parts.join(separator)));
            }
            MapRule::Substring {
                field,
                start,
                len,
                to,
            } => {
                let text = string_field(record, field)?;
                let chars: Vec<char> = text.chars().collect();
                if *start > chars.len() {
                    return Err(AtlasError::Schema {
                        provider: "mapper".into(),
                        reason: format!("substring start {start} past end of `{field}`"),
                    });
                }
                let end = len.map_or(chars.len(), |l| (*start + l).min(chars.len()));
                let slice: String = chars[*start..end].iter().collect();
                record.insert(to.clone(), Value::String(slice));
            }
            MapRule::ExtractRegex { field, pattern, to } => {
                let text = string_field(record, field)?;
                let regex = self
                    .patterns
                    .get(pattern)
                    .ok_or_else(|| AtlasError::Internal {
                        reason: format!("pattern `{pattern}` was not precompiled"),
                    })?;
                let captured = regex
                    .captures(&text)
                    .and_then(|c| c.get(1))
                    .ok_or_else(|| AtlasError::Schema {
                        provider: "mapper".into(),
                        reason: format!("`{pattern}` did not match `{field}`"),
                    })?;
                record.insert(to.clone(), Value::String(captured.as_str().to_owned()));
            }
            MapRule::Default { field, value } => {
                let absent = matches!(record.get(field), None | Some(Value::Null));
                if absent {
                    record.insert(field.clone(), value.clone());
                }
            }
            MapRule::Require { field } => {
                let present = match record.get(field) {
                    None | Some(Value::Null) => false,
                    Some(Value::String(s)) => !s.trim().is_empty(),
                    Some(_) => true,
                };
                if !present {
                    return Err(missing(field));
                }
            }
            MapRule::NormalizeTrim { field } => {
                if let Some(Value::String(s)) = record.get(field) {
                    let trimmed = s.trim().to_owned();
                    record.insert(field.clone(), Value::String(trimmed));
                }
            }
        }
        Ok(())
    }
}

fn missing(field: &str) -> AtlasError {
    AtlasError::Schema {
        provider: "mapper".into(),
        reason: format!("required property `{field}` is missing or empty"),
    }
}

fn string_field(record: &Map<String, Value>, field: &str) -> AtlasResult<String> {
    match record.get(field) {
        Some(Value::String(s)) => Ok(s.clone()),
        Some(other) => Ok(stringify(other)),
        None => Err(missing(field)),
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn props(pairs: &[(&str, Value)]) -> Map<String, Value> {
        pairs
            .iter()
            .map(|(k, v)| ((*k).to_owned(), v.clone()))
            .collect()
    }

    #[test]
    fn rename_moves_property() {
        let mapper = FieldMapper::new(
            vec![MapRule::Rename {
                from: "DISTRICT".into(),
                to: "GEOID".into(),
            }],
            MapperMode::Strict,
        )
        .unwrap();
        let mapped = mapper
            .apply(&props(&[("DISTRICT", json!("0612"))]))
            .unwrap()
            .unwrap();
        assert_eq!(mapped["GEOID"], json!("0612"));
        assert!(!mapped.contains_key("DISTRICT"));
    }

    #[test]
    fn concat_builds_geoid_from_parts() {
        let mapper = FieldMapper::new(
            vec![MapRule::Concat {
                fields: vec!["STATEFP".into(), "CD118FP".into()],
                separator: String::new(),
                to: "GEOID".into(),
            }],
            MapperMode::Strict,
        )
        .unwrap();
        let mapped = mapper
            .apply(&props(&[("STATEFP", json!("55")), ("CD118FP", json!("03"))]))
            .unwrap()
            .unwrap();
        assert_eq!(mapped["GEOID"], json!("5503"));
    }

    #[test]
    fn substring_takes_char_range() {
        let mapper = FieldMapper::new(
            vec![MapRule::Substring {
                field: "GEOID20".into(),
                start: 0,
                len: Some(5),
                to: "COUNTYFP".into(),
            }],
            MapperMode::Strict,
        )
        .unwrap();
        let mapped = mapper
            .apply(&props(&[("GEOID20", json!("5502500101"))]))
            .unwrap()
            .unwrap();
        assert_eq!(mapped["COUNTYFP"], json!("55025"));
    }

    #[test]
    fn extract_regex_takes_first_group() {
        let mapper = FieldMapper::new(
            vec![MapRule::ExtractRegex {
                field: "NAME".into(),
                pattern: r"Ward (\d+)".into(),
                to: "WARD_NUM".into(),
            }],
            MapperMode::Strict,
        )
        .unwrap();
        let mapped = mapper
            .apply(&props(&[("NAME", json!("Ward 3"))]))
            .unwrap()
            .unwrap();
        assert_eq!(mapped["WARD_NUM"], json!("3"));
    }

    #[test]
    fn default_fills_only_missing() {
        let mapper = FieldMapper::new(
            vec![MapRule::Default {
                field: "STATEFP".into(),
                value: json!("11"),
            }],
            MapperMode::Strict,
        )
        .unwrap();
        let filled = mapper.apply(&props(&[])).unwrap().unwrap();
        assert_eq!(filled["STATEFP"], json!("11"));
        let kept = mapper
            .apply(&props(&[("STATEFP", json!("55"))]))
            .unwrap()
            .unwrap();
        assert_eq!(kept["STATEFP"], json!("55"));
    }

    #[test]
    fn require_rejects_blank_strings() {
        let mapper = FieldMapper::new(
            vec![MapRule::Require {
                field: "GEOID".into(),
            }],
            MapperMode::Strict,
        )
        .unwrap();
        assert!(mapper.apply(&props(&[("GEOID", json!("  "))])).is_err());
        assert!(mapper.apply(&props(&[("GEOID", json!("0612"))])).is_ok());
    }

    #[test]
    fn trim_normalizes_whitespace() {
        let mapper = FieldMapper::new(
            vec![MapRule::NormalizeTrim {
                field: "NAME".into(),
            }],
            MapperMode::Strict,
        )
        .unwrap();
        let mapped = mapper
            .apply(&props(&[("NAME", json!("  Ward 3  "))]))
            .unwrap()
            .unwrap();
        assert_eq!(mapped["NAME"], json!("Ward 3"));
    }

    #[test]
    fn soft_mode_skips_unmappable_records() {
        let mapper = FieldMapper::new(
            vec![MapRule::Require {
                field: "GEOID".into(),
            }],
            MapperMode::Soft,
        )
        .unwrap();
        assert_eq!(mapper.apply(&props(&[])).unwrap(), None);
    }

    #[test]
    fn strict_mode_propagates_schema_error() {
        let mapper = FieldMapper::new(
            vec![MapRule::Require {
                field: "GEOID".into(),
            }],
            MapperMode::Strict,
        )
        .unwrap();
        let err = mapper.apply(&props(&[])).unwrap_err();
        assert_eq!(err.class(), atlas_core::ErrorClass::SchemaError);
    }

    #[test]
    fn config_round_trips_from_json() {
        let config = r#"{
            "mode": "soft",
            "rules": [
                {"op": "rename", "from": "DISTRICT", "to": "GEOID"},
                {"op": "normalize-trim", "field": "GEOID"},
                {"op": "require", "field": "GEOID"}
            ]
        }"#;
        let mapper = FieldMapper::from_json(config).unwrap();
        assert_eq!(mapper.mode(), MapperMode::Soft);
        let mapped = mapper
            .apply(&props(&[("DISTRICT", json!(" 0612 "))]))
            .unwrap()
            .unwrap();
        assert_eq!(mapped["GEOID"], json!("0612"));
    }

    #[test]
    fn bad_pattern_fails_at_construction() {
        let err = FieldMapper::new(
            vec![MapRule::ExtractRegex {
                field: "NAME".into(),
                pattern: "(unclosed".into(),
                to: "X".into(),
            }],
            MapperMode::Strict,
        )
        .unwrap_err();
        assert_eq!(err.class(), atlas_core::ErrorClass::FormatError);
    }
}
