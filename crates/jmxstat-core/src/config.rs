//! Sampling request and configuration errors.

use std::time::Duration;

use crate::resource::ResourceId;

/// Minimum pause between two samples, and the default interval.
pub const MIN_INTERVAL: Duration = Duration::from_millis(250);

/// Configuration problems, detected before any output is produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Resource identifier is malformed.
    InvalidResource { input: String, reason: String },
    /// Endpoint address is malformed or uses an unsupported scheme.
    InvalidEndpoint { input: String, reason: String },
    /// No attribute names were given.
    NoAttributes,
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::InvalidResource { input, reason } => {
                write!(f, "invalid object name '{}': {}", input, reason)
            }
            ConfigError::InvalidEndpoint { input, reason } => {
                write!(f, "invalid service URL '{}': {}", input, reason)
            }
            ConfigError::NoAttributes => write!(f, "no attribute names given"),
        }
    }
}

impl std::error::Error for ConfigError {}

/// What to put in the leading `time` column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimestampMode {
    /// No time column.
    #[default]
    None,
    /// Milliseconds since the first sample.
    Elapsed,
    /// Milliseconds since the Unix epoch.
    Epoch,
}

impl TimestampMode {
    /// Resolves the `--timestamp` / `--unixtime` flag pair.
    pub fn from_flags(show_timestamp: bool, unix_time: bool) -> Self {
        match (show_timestamp, unix_time) {
            (false, _) => TimestampMode::None,
            (true, false) => TimestampMode::Elapsed,
            (true, true) => TimestampMode::Epoch,
        }
    }

    pub fn is_enabled(self) -> bool {
        self != TimestampMode::None
    }
}

/// Immutable description of one sampling run.
#[derive(Debug, Clone)]
pub struct SampleRequest {
    resource: ResourceId,
    attributes: Vec<String>,
    interval: Duration,
    header_repeat: u32,
    timestamp: TimestampMode,
    count: Option<u64>,
}

impl SampleRequest {
    /// Creates a request with the default interval, no header repetition and
    /// no timestamps.
    pub fn new(resource: ResourceId, attributes: Vec<String>) -> Result<Self, ConfigError> {
        if attributes.is_empty() {
            return Err(ConfigError::NoAttributes);
        }
        Ok(Self {
            resource,
            attributes,
            interval: MIN_INTERVAL,
            header_repeat: 0,
            timestamp: TimestampMode::None,
            count: None,
        })
    }

    /// Sets the sampling interval. `Duration::ZERO` samples once.
    ///
    /// The loop does not clamp: callers apply [`clamp_interval_ms`] first.
    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    /// Re-emits the header after this many data rows (0 = never).
    pub fn with_header_repeat(mut self, rows: u32) -> Self {
        self.header_repeat = rows;
        self
    }

    pub fn with_timestamp(mut self, mode: TimestampMode) -> Self {
        self.timestamp = mode;
        self
    }

    /// Stops after this many data rows.
    pub fn with_count(mut self, count: Option<u64>) -> Self {
        self.count = count;
        self
    }

    pub fn resource(&self) -> &ResourceId {
        &self.resource
    }

    pub fn attributes(&self) -> &[String] {
        &self.attributes
    }

    pub fn interval(&self) -> Duration {
        self.interval
    }

    pub fn header_repeat(&self) -> u32 {
        self.header_repeat
    }

    pub fn timestamp(&self) -> TimestampMode {
        self.timestamp
    }

    pub fn count(&self) -> Option<u64> {
        self.count
    }

    pub fn is_one_shot(&self) -> bool {
        self.interval.is_zero()
    }

    /// Header cells: `time` (if enabled) followed by the attribute names.
    pub fn header_cells(&self) -> Vec<&str> {
        let mut cells = Vec::with_capacity(self.attributes.len() + 1);
        if self.timestamp.is_enabled() {
            cells.push("time");
        }
        cells.extend(self.attributes.iter().map(String::as_str));
        cells
    }
}

/// Splits a comma-separated attribute list. Blank items are dropped.
pub fn parse_attribute_list(input: &str) -> Result<Vec<String>, ConfigError> {
    let names: Vec<String> = input
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if names.is_empty() {
        return Err(ConfigError::NoAttributes);
    }
    Ok(names)
}

/// Raises a positive interval to [`MIN_INTERVAL`]. Zero (one-shot) is kept.
pub fn clamp_interval_ms(ms: u64) -> u64 {
    let floor = MIN_INTERVAL.as_millis() as u64;
    if ms == 0 { 0 } else { ms.max(floor) }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn resource() -> ResourceId {
        ResourceId::parse("java.lang:type=Memory").unwrap()
    }

    #[test]
    fn test_parse_attribute_list() {
        assert_eq!(
            parse_attribute_list("HeapMemoryUsage").unwrap(),
            ["HeapMemoryUsage"]
        );
        assert_eq!(
            parse_attribute_list("a, b,,c ,").unwrap(),
            ["a", "b", "c"]
        );
        assert_eq!(parse_attribute_list("a,a").unwrap(), ["a", "a"]);
        assert_eq!(parse_attribute_list(" , ,"), Err(ConfigError::NoAttributes));
        assert_eq!(parse_attribute_list(""), Err(ConfigError::NoAttributes));
    }

    #[test]
    fn test_clamp_interval() {
        assert_eq!(clamp_interval_ms(0), 0);
        assert_eq!(clamp_interval_ms(1), 250);
        assert_eq!(clamp_interval_ms(249), 250);
        assert_eq!(clamp_interval_ms(250), 250);
        assert_eq!(clamp_interval_ms(1000), 1000);
    }

    #[test]
    fn test_timestamp_flags() {
        assert_eq!(TimestampMode::from_flags(false, false), TimestampMode::None);
        assert_eq!(TimestampMode::from_flags(false, true), TimestampMode::None);
        assert_eq!(TimestampMode::from_flags(true, false), TimestampMode::Elapsed);
        assert_eq!(TimestampMode::from_flags(true, true), TimestampMode::Epoch);
    }

    #[test]
    fn test_request_defaults() {
        let req = SampleRequest::new(resource(), vec!["a".into()]).unwrap();
        assert_eq!(req.interval(), MIN_INTERVAL);
        assert_eq!(req.header_repeat(), 0);
        assert_eq!(req.timestamp(), TimestampMode::None);
        assert_eq!(req.count(), None);
        assert!(!req.is_one_shot());
        assert!(SampleRequest::new(resource(), Vec::new()).is_err());
    }

    #[test]
    fn test_header_cells() {
        let req = SampleRequest::new(resource(), vec!["a".into(), "b".into()]).unwrap();
        assert_eq!(req.header_cells(), ["a", "b"]);

        let req = req.with_timestamp(TimestampMode::Elapsed);
        assert_eq!(req.header_cells(), ["time", "a", "b"]);
    }
}
