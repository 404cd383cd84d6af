use std::sync::{Arc, Mutex};

use serde::Serialize;
use tokio::sync::mpsc;

/// One progress notification
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProgressUpdate {
    /// Overall completion in `[0, 1]`
    pub fraction: f64,

    pub stage: String,
}

/// Sends monotonic progress updates over a channel.
///
/// A reporter can be narrowed to a band of the overall range with
/// [`ProgressReporter::band`]; the band's `0..1` maps onto `start..end` and
/// shares the monotonic floor with its parent.
#[derive(Debug, Clone)]
pub struct ProgressReporter {
    tx: Option<mpsc::UnboundedSender<ProgressUpdate>>,
    floor: Arc<Mutex<f64>>,
    start: f64,
    end: f64,
}

impl ProgressReporter {
    /// Create a reporter and the receiving end of its channel
    pub fn channel() -> (Self, mpsc::UnboundedReceiver<ProgressUpdate>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let reporter = Self {
            tx: Some(tx),
            floor: Arc::new(Mutex::new(0.0)),
            start: 0.0,
            end: 1.0,
        };
        (reporter, rx)
    }

    /// A reporter that drops every update
    pub fn disabled() -> Self {
        Self {
            tx: None,
            floor: Arc::new(Mutex::new(0.0)),
            start: 0.0,
            end: 1.0,
        }
    }

    /// Narrow this reporter to `start..end` of its own range
    pub fn band(&self, start: f64, end: f64) -> Self {
        let span = self.end - self.start;
        Self {
            tx: self.tx.clone(),
            floor: Arc::clone(&self.floor),
            start: self.start + span * start.clamp(0.0, 1.0),
            end: self.start + span * end.clamp(0.0, 1.0),
        }
    }

    /// Report `fraction` of this reporter's band. Updates never move backwards.
    pub fn report(&self, fraction: f64, stage: &str) {
        let fraction = if fraction.is_finite() { fraction.clamp(0.0, 1.0) } else { 0.0 };
        let mapped = self.start + (self.end - self.start) * fraction;

        let value = match self.floor.lock() {
            Ok(mut floor) => {
                let value = mapped.max(*floor);
                *floor = value;
                value
            }
            Err(_) => return,
        };

        if let Some(tx) = &self.tx {
            // A dropped receiver only means nobody is listening
            let _ = tx.send(ProgressUpdate { fraction: value, stage: stage.to_string() });
        }
    }

    /// Highest overall fraction reported so far
    pub fn current(&self) -> f64 {
        self.floor.lock().map(|floor| *floor).unwrap_or(0.0)
    }
}
