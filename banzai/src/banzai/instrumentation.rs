use std::sync::Mutex;
use std::time::Duration;

/// Receives one timing per filter call.
pub trait InstrumentationSink: Send + Sync {
    fn record(&self, pipeline: &str, filter: &str, elapsed: Duration);
}

/// Logs timings at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogSink;

impl InstrumentationSink for LogSink {
    fn record(&self, pipeline: &str, filter: &str, elapsed: Duration) {
        log::debug!("{pipeline} pipeline: {filter} filter took {elapsed:?}");
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct NullSink;

impl InstrumentationSink for NullSink {
    fn record(&self, _pipeline: &str, _filter: &str, _elapsed: Duration) {}
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Timing {
    pub pipeline: String,
    pub filter: String,
    pub elapsed: Duration,
}

/// Keeps every timing in memory.
#[derive(Debug, Default)]
pub struct RecordingSink {
    timings: Mutex<Vec<Timing>>,
}

impl RecordingSink {
    pub fn timings(&self) -> Vec<Timing> {
        self.timings.lock().map(|t| t.clone()).unwrap_or_default()
    }

    /// `(pipeline, filter)` pairs in call order.
    pub fn calls(&self) -> Vec<(String, String)> {
        self.timings()
            .into_iter()
            .map(|t| (t.pipeline, t.filter))
            .collect()
    }

    pub fn total(&self, pipeline: &str) -> Duration {
        self.timings()
            .iter()
            .filter(|t| t.pipeline == pipeline)
            .map(|t| t.elapsed)
            .sum()
    }
}

impl InstrumentationSink for RecordingSink {
    fn record(&self, pipeline: &str, filter: &str, elapsed: Duration) {
        if let Ok(mut timings) = self.timings.lock() {
            timings.push(Timing {
                pipeline: pipeline.to_string(),
                filter: filter.to_string(),
                elapsed,
            });
        }
    }
}
