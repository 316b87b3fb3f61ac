//! End-to-end runs of the sampling loop against a scripted source and a
//! manual clock.

use std::time::Duration;

use jmxstat_core::source::MockSource;
use jmxstat_core::{
    AttributeValue, ConnectionError, FetchError, ManualClock, ResourceId, RunState, SampleError,
    SampleRequest, Sampler, Shutdown, TimestampMode,
};

fn request(attributes: &[&str]) -> SampleRequest {
    SampleRequest::new(
        ResourceId::parse("java.lang:type=Memory").unwrap(),
        attributes.iter().map(|s| s.to_string()).collect(),
    )
    .unwrap()
}

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

fn data_rows(lines: &[String], header: &str) -> usize {
    lines
        .iter()
        .filter(|l| !l.is_empty() && l.as_str() != header)
        .count()
}

#[test]
fn slow_fetch_sleeps_minimum_floor() {
    let clock = ManualClock::new();
    let source = MockSource::new()
        .with_attribute("a", 1)
        .with_fetch_delay(clock.clone(), ms(1200));
    let req = request(&["a"]).with_interval(ms(1000)).with_count(Some(3));

    let mut sampler = Sampler::new(req, source, Vec::new(), clock.clone());
    sampler.run(&Shutdown::new()).unwrap();

    assert_eq!(clock.sleeps(), [ms(250), ms(250)]);
}

#[test]
fn fast_fetch_sleeps_rest_of_interval() {
    let clock = ManualClock::new();
    let source = MockSource::new()
        .with_attribute("a", 1)
        .with_attribute("b", 2)
        .with_fetch_delay(clock.clone(), ms(50));
    let req = request(&["a", "b"]).with_interval(ms(1000)).with_count(Some(2));

    let mut sampler = Sampler::new(req, source, Vec::new(), clock.clone());
    sampler.run(&Shutdown::new()).unwrap();

    // two fetches of 50ms per tick
    assert_eq!(clock.sleeps(), [ms(900)]);
}

#[test]
fn zero_interval_samples_once_without_sleeping() {
    let clock = ManualClock::new();
    let source = MockSource::new().with_attribute("a", 5);
    let req = request(&["a"])
        .with_interval(Duration::ZERO)
        .with_header_repeat(1);

    let mut sampler = Sampler::new(req, source.clone(), Vec::new(), clock.clone());
    assert_eq!(sampler.run(&Shutdown::new()).unwrap(), 1);

    assert!(clock.sleeps().is_empty());
    assert_eq!(sampler.writer(), &["a", "5", ""]);
    assert_eq!(sampler.state(), RunState::Stopped);
    assert_eq!(source.close_count(), 1);
}

#[test]
fn header_repeats_every_third_row() {
    let source = MockSource::new().with_series("a", (1..=7i64).map(AttributeValue::from).collect());
    let req = request(&["a"]).with_header_repeat(3).with_count(Some(7));

    let mut sampler = Sampler::new(req, source, Vec::new(), ManualClock::new());
    sampler.run(&Shutdown::new()).unwrap();

    assert_eq!(
        sampler.writer(),
        &["a", "1", "2", "3", "a", "4", "5", "6", "a", "7", ""]
    );
}

#[test]
fn header_never_repeats_by_default() {
    let source = MockSource::new().with_attribute("a", 1);
    let req = request(&["a"]).with_count(Some(10));

    let mut sampler = Sampler::new(req, source, Vec::new(), ManualClock::new());
    sampler.run(&Shutdown::new()).unwrap();

    let lines = sampler.writer();
    assert_eq!(lines.iter().filter(|l| l.as_str() == "a").count(), 1);
    assert_eq!(lines.len(), 12);
}

#[test]
fn elapsed_timestamp_column() {
    let clock = ManualClock::new();
    let source = MockSource::new()
        .with_attribute("a", 1)
        .with_attribute("b", AttributeValue::map([("k", "v")]))
        .with_fetch_delay(clock.clone(), ms(10));
    let req = request(&["a", "b"])
        .with_interval(ms(500))
        .with_timestamp(TimestampMode::Elapsed)
        .with_count(Some(3));

    let mut sampler = Sampler::new(req, source, Vec::new(), clock);
    sampler.run(&Shutdown::new()).unwrap();

    let lines = sampler.writer();
    assert_eq!(lines[0], "time\ta\tb");
    for line in &lines[1..4] {
        assert_eq!(line.split('\t').count(), 3);
    }
    assert_eq!(lines[1], "0\t1\t[k=v]");
    assert_eq!(lines[2], "500\t1\t[k=v]");
    assert_eq!(lines[3], "1000\t1\t[k=v]");
}

#[test]
fn epoch_timestamp_column() {
    let clock = ManualClock::new().with_epoch_origin(1_700_000_000_000);
    let source = MockSource::new().with_attribute("a", 1);
    let req = request(&["a"])
        .with_interval(ms(250))
        .with_timestamp(TimestampMode::Epoch)
        .with_count(Some(2));

    let mut sampler = Sampler::new(req, source, Vec::new(), clock);
    sampler.run(&Shutdown::new()).unwrap();

    assert_eq!(
        sampler.writer(),
        &["time\ta", "1700000000000\t1", "1700000000250\t1", ""]
    );
}

#[test]
fn null_values_render_empty_cells() {
    let source = MockSource::new()
        .with_attribute("a", AttributeValue::Null)
        .with_attribute("b", 3);
    let req = request(&["a", "b"]).with_interval(Duration::ZERO);

    let mut sampler = Sampler::new(req, source, Vec::new(), ManualClock::new());
    sampler.run(&Shutdown::new()).unwrap();

    assert_eq!(sampler.writer()[1], "\t3");
}

#[test]
fn fetch_error_discards_partial_row() {
    let source = MockSource::new()
        .with_attribute("a", 1)
        .with_attribute("b", 2)
        // tick 3, second attribute
        .fail_on_fetch(6, FetchError::Transport("connection reset".into()));
    let req = request(&["a", "b"]).with_count(Some(10));

    let mut sampler = Sampler::new(req, source.clone(), Vec::new(), ManualClock::new());
    let err = sampler.run(&Shutdown::new()).unwrap_err();

    match err {
        SampleError::Fetch { attribute, source } => {
            assert_eq!(attribute, "b");
            assert_eq!(source, FetchError::Transport("connection reset".into()));
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(sampler.rows_written(), 2);
    assert_eq!(sampler.writer(), &["a\tb", "1\t2", "1\t2"]);
    assert_eq!(data_rows(sampler.writer(), "a\tb"), 2);
    assert_eq!(sampler.state(), RunState::Stopped);
    assert_eq!(source.connect_count(), 1);
    assert_eq!(source.close_count(), 1);
}

#[test]
fn one_connection_serves_every_tick() {
    let source = MockSource::new().with_attribute("a", 1);
    let req = request(&["a"]).with_count(Some(5));

    let mut sampler = Sampler::new(req, source.clone(), Vec::new(), ManualClock::new());
    assert_eq!(sampler.run(&Shutdown::new()).unwrap(), 5);

    assert_eq!(source.connect_count(), 1);
    assert_eq!(source.fetch_count(), 5);
    assert_eq!(source.close_count(), 1);
}

#[test]
fn zero_count_writes_no_rows() {
    let clock = ManualClock::new();
    let source = MockSource::new().with_attribute("a", 1);
    let req = request(&["a"]).with_count(Some(0));

    let mut sampler = Sampler::new(req, source.clone(), Vec::new(), clock.clone());
    assert_eq!(sampler.run(&Shutdown::new()).unwrap(), 0);

    assert_eq!(sampler.writer(), &["a", ""]);
    assert_eq!(source.fetch_count(), 0);
    assert_eq!(source.close_count(), 1);
    assert!(clock.sleeps().is_empty());
}

#[test]
fn count_stops_after_exact_number_of_rows() {
    let source = MockSource::new().with_attribute("a", 1);
    let req = request(&["a"]).with_count(Some(1));

    let mut sampler = Sampler::new(req, source.clone(), Vec::new(), ManualClock::new());
    assert_eq!(sampler.run(&Shutdown::new()).unwrap(), 1);

    assert_eq!(sampler.writer(), &["a", "1", ""]);
    assert_eq!(source.fetch_count(), 1);
}

#[test]
fn text_with_tabs_and_newlines_stays_in_its_cell() {
    let source = MockSource::new()
        .with_attribute("a", "first\tsecond\nthird")
        .with_attribute("b", 2);
    let req = request(&["a", "b"]).with_interval(Duration::ZERO);

    let mut sampler = Sampler::new(req, source, Vec::new(), ManualClock::new());
    sampler.run(&Shutdown::new()).unwrap();

    let row = &sampler.writer()[1];
    assert_eq!(row, "first second third\t2");
    assert_eq!(row.split('\t').count(), 2);
}

#[test]
fn integral_float_keeps_its_fraction() {
    let source = MockSource::new()
        .with_attribute("load", 1.0)
        .with_attribute("count", 1);
    let req = request(&["load", "count"]).with_interval(Duration::ZERO);

    let mut sampler = Sampler::new(req, source, Vec::new(), ManualClock::new());
    sampler.run(&Shutdown::new()).unwrap();

    assert_eq!(sampler.writer()[1], "1.0\t1");
}

#[test]
fn connection_failure_writes_nothing() {
    let source = MockSource::new()
        .with_attribute("a", 1)
        .refuse_connections(ConnectionError::AuthenticationRejected("HTTP 401".into()));
    let req = request(&["a"]);

    let mut sampler = Sampler::new(req, source.clone(), Vec::new(), ManualClock::new());
    let err = sampler.run(&Shutdown::new()).unwrap_err();

    assert!(matches!(
        err,
        SampleError::Connection(ConnectionError::AuthenticationRejected(_))
    ));
    assert!(sampler.writer().is_empty());
    assert_eq!(source.fetch_count(), 0);
    assert_eq!(source.close_count(), 0);
}

#[test]
fn shutdown_signal_drains() {
    let shutdown = Shutdown::new();
    let clock = ManualClock::new();
    let source = MockSource::new()
        .with_attribute("a", 1)
        .shutdown_after_fetches(4, shutdown.clone());
    let req = request(&["a"]).with_interval(ms(1000));

    let mut sampler = Sampler::new(req, source.clone(), Vec::new(), clock.clone());
    assert_eq!(sampler.run(&shutdown).unwrap(), 4);

    let lines = sampler.writer();
    assert_eq!(lines.last().map(String::as_str), Some(""));
    assert_eq!(lines.len(), 6);
    // no pause once the signal is seen
    assert_eq!(clock.sleeps().len(), 3);
    assert_eq!(source.connect_count(), 1);
    assert_eq!(source.close_count(), 1);
}

#[test]
fn shutdown_before_first_tick() {
    let shutdown = Shutdown::new();
    shutdown.request();
    let source = MockSource::new().with_attribute("a", 1);

    let mut sampler = Sampler::new(request(&["a"]), source.clone(), Vec::new(), ManualClock::new());
    assert_eq!(sampler.run(&shutdown).unwrap(), 0);

    assert_eq!(sampler.writer(), &["a", ""]);
    assert_eq!(source.fetch_count(), 0);
    assert_eq!(source.close_count(), 1);
}
