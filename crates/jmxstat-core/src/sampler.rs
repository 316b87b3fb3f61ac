//! The sampling loop.
//!
//! ```text
//!  Idle ──connect──▶ Running ──shutdown / one-shot / count──▶ Draining ──▶ Stopped
//!                       │
//!                       └── fetch or output error ──▶ Stopped (connection released)
//! ```
//!
//! Each tick fetches every requested attribute in order, converts the values
//! into cells and writes one row. After a tick the loop pauses for what is left
//! of the interval, but never less than [`MIN_INTERVAL`], so slow endpoints are
//! not polled back to back.

use std::io;
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::clock::{Clock, Shutdown};
use crate::config::{MIN_INTERVAL, SampleRequest, TimestampMode};
use crate::convert::ConverterChain;
use crate::output::{RowWriter, join_cells};
use crate::source::{Connection, ConnectionError, Connector, FetchError};
use crate::value::AttributeValue;

/// Error that ends a run.
#[derive(Debug)]
pub enum SampleError {
    /// Connection could not be opened; nothing was written.
    Connection(ConnectionError),
    /// A read failed; the tick's row was discarded.
    Fetch {
        attribute: String,
        source: FetchError,
    },
    /// Writing a row failed.
    Output(io::Error),
}

impl std::fmt::Display for SampleError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SampleError::Connection(e) => write!(f, "connection failed: {}", e),
            SampleError::Fetch { attribute, source } => {
                write!(f, "reading attribute '{}' failed: {}", attribute, source)
            }
            SampleError::Output(e) => write!(f, "output error: {}", e),
        }
    }
}

impl std::error::Error for SampleError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            SampleError::Connection(e) => Some(e),
            SampleError::Fetch { source, .. } => Some(source),
            SampleError::Output(e) => Some(e),
        }
    }
}

impl From<ConnectionError> for SampleError {
    fn from(e: ConnectionError) -> Self {
        SampleError::Connection(e)
    }
}

impl From<io::Error> for SampleError {
    fn from(e: io::Error) -> Self {
        SampleError::Output(e)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunState {
    Idle,
    Running,
    Draining,
    Stopped,
}

/// Pause after a tick that took `spent`: the rest of the interval, at least
/// [`MIN_INTERVAL`].
pub fn pause_after(interval: Duration, spent: Duration) -> Duration {
    interval.saturating_sub(spent).max(MIN_INTERVAL)
}

/// Drives one sampling run.
pub struct Sampler<C: Connector, W: RowWriter, K: Clock> {
    request: SampleRequest,
    connector: C,
    converter: Arc<ConverterChain>,
    writer: W,
    clock: K,
    state: RunState,
    header: String,
    /// Monotonic time of the first tick.
    started_at: Option<Duration>,
    rows_since_header: u32,
    rows_written: u64,
}

impl<C: Connector, W: RowWriter, K: Clock> Sampler<C, W, K> {
    pub fn new(request: SampleRequest, connector: C, writer: W, clock: K) -> Self {
        let header = join_cells(&request.header_cells());
        Self {
            request,
            connector,
            converter: ConverterChain::standard(),
            writer,
            clock,
            state: RunState::Idle,
            header,
            started_at: None,
            rows_since_header: 0,
            rows_written: 0,
        }
    }

    /// Replaces the standard converter chain.
    pub fn with_converter(mut self, converter: Arc<ConverterChain>) -> Self {
        self.converter = converter;
        self
    }

    pub fn state(&self) -> RunState {
        self.state
    }

    /// Data rows written so far.
    pub fn rows_written(&self) -> u64 {
        self.rows_written
    }

    pub fn writer(&self) -> &W {
        &self.writer
    }

    pub fn into_writer(self) -> W {
        self.writer
    }

    /// Runs until shutdown is requested, the sample count is reached, or (with
    /// a zero interval) after a single row.
    ///
    /// Returns the number of data rows written. A connection failure is
    /// reported before anything is written; a fetch failure ends the run
    /// without writing that tick's row.
    pub fn run(&mut self, shutdown: &Shutdown) -> Result<u64, SampleError> {
        if self.state != RunState::Idle {
            warn!("sampler already ran, ignoring");
            return Ok(self.rows_written);
        }

        let mut connection = match self.connect() {
            Ok(connection) => connection,
            Err(e) => {
                self.state = RunState::Stopped;
                return Err(e.into());
            }
        };

        self.state = RunState::Running;
        match self.sample_loop(&mut connection, shutdown) {
            Ok(()) => {
                self.drain(connection)?;
                Ok(self.rows_written)
            }
            Err(e) => {
                // the caller reports the error itself
                debug!("sampling stopped after {} rows", self.rows_written);
                self.release(connection);
                self.state = RunState::Stopped;
                Err(e)
            }
        }
    }

    fn sample_loop(
        &mut self,
        connection: &mut C::Connection,
        shutdown: &Shutdown,
    ) -> Result<(), SampleError> {
        let one_shot = self.request.is_one_shot();
        self.writer.write_line(&self.header)?;

        while !shutdown.is_requested() {
            if self.count_reached() {
                break;
            }

            let tick_start = self.clock.now();
            let started_at = *self.started_at.get_or_insert(tick_start);
            let elapsed = tick_start.saturating_sub(started_at);

            if !one_shot && self.header_due() {
                self.writer.write_line(&self.header)?;
                self.rows_since_header = 0;
            }

            let sample = self.fetch_sample(connection)?;
            let row = self.format_row(elapsed, &sample);
            self.writer.write_line(&join_cells(&row))?;
            self.rows_written += 1;
            self.rows_since_header += 1;

            if one_shot {
                debug!("one-shot sample written");
                break;
            }
            if self.count_reached() {
                info!("sample count {} reached", self.rows_written);
                break;
            }
            if shutdown.is_requested() {
                break;
            }

            let spent = self.clock.now().saturating_sub(tick_start);
            let pause = pause_after(self.request.interval(), spent);
            if spent > self.request.interval() {
                debug!(
                    "tick took {}ms, longer than the {}ms interval",
                    spent.as_millis(),
                    self.request.interval().as_millis()
                );
            }
            self.clock.sleep(pause, shutdown);
        }

        Ok(())
    }

    /// Whether the header is due again before the next row.
    ///
    /// With a repeat period of 1 this is true before every row after the
    /// first, so each data row gets its own header.
    fn header_due(&self) -> bool {
        let repeat = self.request.header_repeat();
        repeat > 0 && self.rows_since_header >= repeat
    }

    fn count_reached(&self) -> bool {
        self.request
            .count()
            .is_some_and(|count| self.rows_written >= count)
    }

    /// Reads all attributes for one tick, in request order.
    fn fetch_sample(
        &self,
        connection: &mut C::Connection,
    ) -> Result<Vec<AttributeValue>, SampleError> {
        let resource = self.request.resource();

        let mut values = Vec::with_capacity(self.request.attributes().len());
        for attribute in self.request.attributes() {
            match connection.fetch(resource, attribute) {
                Ok(value) => values.push(value),
                Err(source) => {
                    return Err(SampleError::Fetch {
                        attribute: attribute.clone(),
                        source,
                    });
                }
            }
        }
        Ok(values)
    }

    fn format_row(&self, elapsed: Duration, sample: &[AttributeValue]) -> Vec<String> {
        let mut cells = Vec::with_capacity(sample.len() + 1);
        match self.request.timestamp() {
            TimestampMode::None => {}
            TimestampMode::Elapsed => cells.push(elapsed.as_millis().to_string()),
            TimestampMode::Epoch => cells.push(self.clock.epoch_millis().to_string()),
        }
        cells.extend(sample.iter().map(|v| self.converter.convert(v)));
        cells
    }

    /// Opens the one connection of the run. Every tick borrows it.
    fn connect(&self) -> Result<C::Connection, ConnectionError> {
        let connection = self.connector.connect()?;
        info!("connected to {}", self.connector.endpoint());
        Ok(connection)
    }

    /// Closes the connection and writes the trailing blank line.
    fn drain(&mut self, connection: C::Connection) -> Result<(), SampleError> {
        self.state = RunState::Draining;
        self.release(connection);
        let result = self.writer.write_line("");
        self.state = RunState::Stopped;
        info!("sampling finished, {} rows written", self.rows_written);
        result.map_err(SampleError::from)
    }

    fn release(&self, connection: C::Connection) {
        match connection.close() {
            Ok(()) => info!("closed connection to {}", self.connector.endpoint()),
            Err(e) => warn!("error while closing connection: {}", e),
        }
    }
}
