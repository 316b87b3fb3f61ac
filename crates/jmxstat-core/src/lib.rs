//! jmxstat-core - sampling engine behind the `jmxstat` tool.
//!
//! Provides:
//! - `value`: attribute value model and its shape tag
//! - `convert`: ordered converter chain that renders values into table cells
//! - `resource`: managed resource identifiers (`domain:key=value,...`)
//! - `config`: sampling request and configuration errors
//! - `source`: attribute source abstraction (connector + connection), mock source
//! - `clock`: time source and cooperative shutdown flag
//! - `output`: tab-separated row output
//! - `sampler`: the sampling loop
//!
//! With `jolokia` feature (default):
//! - `source::jolokia`: JMX attribute reads over Jolokia's HTTP/JSON protocol

pub mod clock;
pub mod config;
pub mod convert;
pub mod output;
pub mod resource;
pub mod sampler;
pub mod source;
pub mod value;

pub use clock::{Clock, ManualClock, Shutdown, SystemClock};
pub use config::{ConfigError, SampleRequest, TimestampMode};
pub use convert::{ConverterChain, DefaultConverter, MapConverter, ValueConverter};
pub use output::{RowWriter, StreamWriter};
pub use resource::ResourceId;
pub use sampler::{RunState, SampleError, Sampler};
pub use source::{Connection, ConnectionError, Connector, Credentials, FetchError};
pub use value::{AttributeValue, Shape};

/// Crate version, shared with the binary for `--version`.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
