use std::time::{Duration, Instant};

use crate::{Error, Result};

/// Records wall-clock intervals between `start` and `stop`.
#[derive(Debug, Clone)]
pub struct Timer {
    times: Vec<Duration>,
    tik: Option<Instant>,
}

impl Default for Timer {
    fn default() -> Self {
        Self::new()
    }
}

impl Timer {
    /// Creates the timer already started
    pub fn new() -> Self {
        Self {
            times: Vec::new(),
            tik: Some(Instant::now()),
        }
    }

    /// (Re)start the interval; an unmatched previous start is discarded.
    pub fn start(&mut self) {
        self.tik = Some(Instant::now());
    }

    /// Record the time since the last `start`, in seconds.
    pub fn stop(&mut self) -> Result<f64> {
        let tik = self.tik.take().ok_or(Error::TimerNotStarted)?;
        let elapsed = tik.elapsed();
        self.times.push(elapsed);
        Ok(elapsed.as_secs_f64())
    }

    pub fn avg(&self) -> Result<f64> {
        Ok(self.sum()? / self.times.len() as f64)
    }

    pub fn sum(&self) -> Result<f64> {
        if self.times.is_empty() {
            return Err(Error::EmptyHistory);
        }
        Ok(self.times.iter().map(Duration::as_secs_f64).sum())
    }

    /// Running totals, one per recorded interval
    pub fn cumsum(&self) -> Vec<f64> {
        self.times
            .iter()
            .scan(0.0, |total, t| {
                *total += t.as_secs_f64();
                Some(*total)
            })
            .collect()
    }

    pub fn times(&self) -> Vec<f64> {
        self.times.iter().map(Duration::as_secs_f64).collect()
    }

    pub fn len(&self) -> usize {
        self.times.len()
    }

    pub fn is_empty(&self) -> bool {
        self.times.is_empty()
    }
}
