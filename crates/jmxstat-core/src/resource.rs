//! Managed resource identifiers.
//!
//! A resource is named `domain:key=value[,key=value...]`, e.g.
//! `java.lang:type=Memory` or `java.lang:type=GarbageCollector,name="G1 Young"`.
//! The property list may be the `*` wildcard or end with `,*`.

use std::fmt;
use std::str::FromStr;

use crate::config::ConfigError;

/// A parsed, validated resource identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceId {
    raw: String,
    domain: String,
    properties: Vec<(String, String)>,
    wildcard: bool,
}

impl ResourceId {
    pub fn parse(input: &str) -> Result<Self, ConfigError> {
        let invalid = |reason: &str| ConfigError::InvalidResource {
            input: input.to_string(),
            reason: reason.to_string(),
        };

        let (domain, props) = input
            .split_once(':')
            .ok_or_else(|| invalid("missing ':' between domain and key properties"))?;
        if domain.contains('\n') {
            return Err(invalid("domain must not contain newlines"));
        }
        if props.is_empty() {
            return Err(invalid("key properties must not be empty"));
        }

        let mut properties: Vec<(String, String)> = Vec::new();
        let mut wildcard = false;
        for part in split_properties(props).map_err(invalid)? {
            if part == "*" {
                if wildcard {
                    return Err(invalid("wildcard '*' given twice"));
                }
                wildcard = true;
                continue;
            }

            let (key, value) = part
                .split_once('=')
                .ok_or_else(|| invalid(&format!("property '{}' has no '='", part)))?;
            if key.is_empty() {
                return Err(invalid("empty property key"));
            }
            if key.contains([':', '"', '*', '?', '\n']) {
                return Err(invalid(&format!("illegal character in key '{}'", key)));
            }
            validate_value(value).map_err(|r| invalid(&format!("{} in value of '{}'", r, key)))?;
            if properties.iter().any(|(k, _)| k == key) {
                return Err(invalid(&format!("duplicate key '{}'", key)));
            }
            properties.push((key.to_string(), value.to_string()));
        }

        Ok(Self {
            raw: input.to_string(),
            domain: domain.to_string(),
            properties,
            wildcard,
        })
    }

    pub fn domain(&self) -> &str {
        &self.domain
    }

    /// Key properties in the order given.
    pub fn properties(&self) -> &[(String, String)] {
        &self.properties
    }

    /// Value of a key property, as written (quoted values keep their quotes).
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    /// Whether the identifier is a pattern matching several resources.
    pub fn is_pattern(&self) -> bool {
        self.wildcard || self.domain.contains(['*', '?'])
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

/// Splits the key property list at commas outside quoted values.
fn split_properties(props: &str) -> Result<Vec<&str>, &'static str> {
    let mut parts = Vec::new();
    let mut start = 0;
    let mut in_quotes = false;
    let mut escaped = false;

    for (i, c) in props.char_indices() {
        if escaped {
            escaped = false;
            continue;
        }
        match c {
            '\\' if in_quotes => escaped = true,
            '"' => in_quotes = !in_quotes,
            ',' if !in_quotes => {
                parts.push(&props[start..i]);
                start = i + 1;
            }
            _ => {}
        }
    }
    if in_quotes {
        return Err("unterminated quoted value");
    }
    parts.push(&props[start..]);

    if parts.iter().any(|p| p.is_empty()) {
        return Err("empty key property");
    }
    Ok(parts)
}

fn validate_value(value: &str) -> Result<(), &'static str> {
    if value.is_empty() {
        return Err("empty value");
    }

    if let Some(body) = value.strip_prefix('"') {
        let Some(body) = body.strip_suffix('"') else {
            return Err("unterminated quote");
        };
        let mut chars = body.chars();
        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some('\\' | '"' | '*' | '?' | 'n') => {}
                    _ => return Err("invalid escape"),
                },
                '"' => return Err("unescaped quote"),
                '\n' => return Err("newline"),
                _ => {}
            }
        }
        return Ok(());
    }

    if value.contains([',', '=', ':', '"', '\n']) {
        return Err("illegal character");
    }
    Ok(())
}

impl FromStr for ResourceId {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ResourceId::parse(s)
    }
}

impl fmt::Display for ResourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
