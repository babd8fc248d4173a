//! Type templates: expected type strings with `{key}` placeholders.
//!
//! `{packageId}::water_cooler::WaterCooler` renders against a stage's resolved
//! reads. Placeholders are parsed once, when the stage is built.

use mizu_core::StoreKey;
use std::collections::BTreeMap;
use std::fmt;

#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TypeTemplate {
    raw: String,
    placeholders: Vec<StoreKey>,
}

impl TypeTemplate {
    /// Parse a template. The error is a human-readable reason.
    pub fn parse(raw: &str) -> Result<Self, String> {
        let mut placeholders = Vec::new();
        let mut rest = raw;
        while let Some(open) = rest.find(['{', '}']) {
            if rest.as_bytes()[open] == b'}' {
                return Err("unmatched '}'".into());
            }
            let after = &rest[open + 1..];
            let close = after.find('}').ok_or("unclosed '{'")?;
            let name = &after[..close];
            if name.contains('{') {
                return Err("nested '{'".into());
            }
            let key = StoreKey::parse(name).map_err(|e| e.to_string())?;
            if !placeholders.contains(&key) {
                placeholders.push(key);
            }
            rest = &after[close + 1..];
        }
        if raw.trim().is_empty() {
            return Err("empty type".into());
        }
        Ok(Self {
            raw: raw.to_string(),
            placeholders,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    pub fn placeholders(&self) -> &[StoreKey] {
        &self.placeholders
    }

    /// Substitute every placeholder. Returns the name of the first placeholder
    /// with no value.
    pub fn render(&self, vars: &BTreeMap<String, String>) -> Result<String, String> {
        let mut s = self.raw.clone();
        for key in &self.placeholders {
            let value = vars
                .get(key.as_str())
                .ok_or_else(|| key.as_str().to_string())?;
            s = s.replace(&format!("{{{}}}", key), value);
        }
        Ok(s)
    }
}

impl fmt::Display for TypeTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
