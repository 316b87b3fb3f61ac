//! Scripted in-memory attribute source for testing the sampler without a
//! live endpoint.
//!
//! Each attribute has a series of values, one per read; the last value repeats
//! once the series is exhausted. Reads can be made slow (by advancing a
//! [`ManualClock`]), can fail on a chosen call, and can trigger a shutdown.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use super::{Connection, ConnectionError, Connector, FetchError};
use crate::clock::{ManualClock, Shutdown};
use crate::resource::ResourceId;
use crate::value::AttributeValue;

#[derive(Debug, Default)]
struct MockState {
    series: HashMap<String, Vec<AttributeValue>>,
    reads: HashMap<String, usize>,
    refuse_connect: Option<ConnectionError>,
    fail_on_fetch: Option<(usize, FetchError)>,
    shutdown_after: Option<(usize, Shutdown)>,
    delay: Option<(ManualClock, Duration)>,
    connects: usize,
    closes: usize,
    fetches: usize,
}

/// Mock connector. Clones share state, so a test keeps one handle to inspect
/// counters after handing another to the sampler.
#[derive(Debug, Clone, Default)]
pub struct MockSource {
    state: Arc<Mutex<MockState>>,
}

impl MockSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attribute with a constant value.
    pub fn with_attribute(self, name: &str, value: impl Into<AttributeValue>) -> Self {
        self.with_series(name, vec![value.into()])
    }

    /// Attribute whose successive reads return successive values.
    pub fn with_series(self, name: &str, values: Vec<AttributeValue>) -> Self {
        self.lock().series.insert(name.to_string(), values);
        self
    }

    /// Every fetch advances `clock` by `delay`.
    pub fn with_fetch_delay(self, clock: ManualClock, delay: Duration) -> Self {
        self.lock().delay = Some((clock, delay));
        self
    }

    /// The `n`-th fetch (1-based, counted across all attributes) fails.
    pub fn fail_on_fetch(self, n: usize, error: FetchError) -> Self {
        self.lock().fail_on_fetch = Some((n, error));
        self
    }

    /// Requests `shutdown` right after the `n`-th fetch completes.
    pub fn shutdown_after_fetches(self, n: usize, shutdown: Shutdown) -> Self {
        self.lock().shutdown_after = Some((n, shutdown));
        self
    }

    pub fn refuse_connections(self, error: ConnectionError) -> Self {
        self.lock().refuse_connect = Some(error);
        self
    }

    pub fn connect_count(&self) -> usize {
        self.lock().connects
    }

    pub fn close_count(&self) -> usize {
        self.lock().closes
    }

    pub fn fetch_count(&self) -> usize {
        self.lock().fetches
    }

    fn lock(&self) -> MutexGuard<'_, MockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Connector for MockSource {
    type Connection = MockConnection;

    fn connect(&self) -> Result<MockConnection, ConnectionError> {
        let mut state = self.lock();
        if let Some(err) = &state.refuse_connect {
            return Err(err.clone());
        }
        state.connects += 1;
        Ok(MockConnection {
            source: self.clone(),
        })
    }

    fn endpoint(&self) -> String {
        "mock://".to_string()
    }
}

/// Connection handed out by [`MockSource`].
#[derive(Debug)]
pub struct MockConnection {
    source: MockSource,
}

impl Connection for MockConnection {
    fn fetch(
        &mut self,
        _resource: &ResourceId,
        attribute: &str,
    ) -> Result<AttributeValue, FetchError> {
        let mut state = self.source.lock();
        state.fetches += 1;
        let call = state.fetches;

        if let Some((clock, delay)) = &state.delay {
            clock.advance(*delay);
        }

        if let Some((n, err)) = &state.fail_on_fetch
            && *n == call
        {
            return Err(err.clone());
        }

        let index = {
            let reads = state.reads.entry(attribute.to_string()).or_insert(0);
            *reads += 1;
            *reads - 1
        };
        let value = match state.series.get(attribute) {
            Some(series) if !series.is_empty() => series[index.min(series.len() - 1)].clone(),
            _ => {
                return Err(FetchError::Remote {
                    status: 404,
                    error_type: Some("AttributeNotFoundException".to_string()),
                    message: format!("no attribute {}", attribute),
                });
            }
        };

        if let Some((n, shutdown)) = &state.shutdown_after
            && *n == call
        {
            shutdown.request();
        }

        Ok(value)
    }

    fn close(self) -> Result<(), ConnectionError> {
        self.source.lock().closes += 1;
        Ok(())
    }
}
