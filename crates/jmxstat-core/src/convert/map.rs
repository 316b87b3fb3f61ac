use std::sync::Arc;

use super::ValueConverter;
use crate::value::{AttributeValue, Shape};

const DEFAULT_KEY_VALUE_SEPARATOR: &str = "=";
const DEFAULT_ENTRY_SEPARATOR: &str = ",";

/// Renders associative values as `[k1=v1,k2=v2]`.
///
/// Keys and values go through their own converters; entries keep the order of
/// the source map.
#[derive(Clone)]
pub struct MapConverter {
    key_converter: Arc<dyn ValueConverter>,
    value_converter: Arc<dyn ValueConverter>,
    key_value_separator: String,
    entry_separator: String,
}

impl MapConverter {
    pub fn new(
        key_converter: Arc<dyn ValueConverter>,
        value_converter: Arc<dyn ValueConverter>,
    ) -> Self {
        Self {
            key_converter,
            value_converter,
            key_value_separator: DEFAULT_KEY_VALUE_SEPARATOR.to_string(),
            entry_separator: DEFAULT_ENTRY_SEPARATOR.to_string(),
        }
    }

    pub fn with_key_value_separator(mut self, separator: impl Into<String>) -> Self {
        self.key_value_separator = separator.into();
        self
    }

    pub fn with_entry_separator(mut self, separator: impl Into<String>) -> Self {
        self.entry_separator = separator.into();
        self
    }
}

impl ValueConverter for MapConverter {
    fn can_handle(&self, shape: Shape) -> bool {
        shape == Shape::Associative
    }

    fn render(&self, value: &AttributeValue) -> String {
        let AttributeValue::Map(entries) = value else {
            return value.to_string();
        };

        let mut out = String::from("[");
        for (i, (key, val)) in entries.iter().enumerate() {
            if i > 0 {
                out.push_str(&self.entry_separator);
            }
            out.push_str(&self.key_converter.render(key));
            out.push_str(&self.key_value_separator);
            out.push_str(&self.value_converter.render(val));
        }
        out.push(']');
        out
    }
}
