//! Value converters: render attribute values into single table cells.
//!
//! A [`ConverterChain`] holds converters in registration order and asks each
//! one, by [`Shape`], whether it handles a value. The first match renders it.
//! Null values short-circuit to an empty cell, and values nobody claims fall
//! back to their generic [`Display`](std::fmt::Display) text, so conversion
//! never fails.
//!
//! ```
//! use jmxstat_core::{AttributeValue, ConverterChain};
//!
//! let chain = ConverterChain::standard();
//! let usage = AttributeValue::map([("used", 512), ("max", 1024)]);
//! assert_eq!(chain.convert(&usage), "[used=512,max=1024]");
//! assert_eq!(chain.convert(&AttributeValue::Null), "");
//! ```

mod map;

pub use map::MapConverter;

use std::sync::{Arc, Weak};

use crate::value::{AttributeValue, Shape};

/// Renders values of the shapes it accepts.
pub trait ValueConverter: Send + Sync {
    /// Whether this converter renders values of the given shape.
    fn can_handle(&self, shape: Shape) -> bool;

    /// Renders a value. Only called for values whose shape passed `can_handle`.
    fn render(&self, value: &AttributeValue) -> String;
}

/// Catch-all converter: the value's generic text representation.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultConverter;

impl ValueConverter for DefaultConverter {
    fn can_handle(&self, _shape: Shape) -> bool {
        true
    }

    fn render(&self, value: &AttributeValue) -> String {
        value.to_string()
    }
}

/// Ordered list of converters; the first one that handles a value wins.
#[derive(Default)]
pub struct ConverterChain {
    converters: Vec<Arc<dyn ValueConverter>>,
}

impl ConverterChain {
    /// Creates an empty chain. Every non-null value renders through the
    /// generic fallback until converters are registered.
    pub fn new() -> Self {
        Self::default()
    }

    /// The chain used by the sampler: maps first (with keys and values rendered
    /// by this same chain, so nested maps work), then the catch-all.
    pub fn standard() -> Arc<Self> {
        Arc::new_cyclic(|this: &Weak<ConverterChain>| {
            ConverterChain::new()
                .with(MapConverter::new(
                    Arc::new(ChainRef(this.clone())),
                    Arc::new(ChainRef(this.clone())),
                ))
                .with(DefaultConverter)
        })
    }

    /// Appends a converter at the end of the chain.
    pub fn with(mut self, converter: impl ValueConverter + 'static) -> Self {
        self.register(Arc::new(converter));
        self
    }

    /// Appends a shared converter at the end of the chain.
    pub fn register(&mut self, converter: Arc<dyn ValueConverter>) {
        self.converters.push(converter);
    }

    pub fn len(&self) -> usize {
        self.converters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.converters.is_empty()
    }

    /// Renders a value into a cell. Never fails.
    pub fn convert(&self, value: &AttributeValue) -> String {
        if value.is_null() {
            return String::new();
        }

        let shape = value.shape();
        self.converters
            .iter()
            .find(|c| c.can_handle(shape))
            .map(|c| c.render(value))
            .unwrap_or_else(|| value.to_string())
    }
}

impl ValueConverter for ConverterChain {
    fn can_handle(&self, _shape: Shape) -> bool {
        true
    }

    fn render(&self, value: &AttributeValue) -> String {
        self.convert(value)
    }
}

/// Back-reference from a sub-converter to the chain that owns it.
struct ChainRef(Weak<ConverterChain>);

impl ValueConverter for ChainRef {
    fn can_handle(&self, _shape: Shape) -> bool {
        true
    }

    fn render(&self, value: &AttributeValue) -> String {
        match self.0.upgrade() {
            Some(chain) => chain.convert(value),
            None => value.to_string(),
        }
    }
}
