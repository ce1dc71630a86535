// Pwspush - Push personal weather station readings to Weather Underground
//
// Copyright 2022 Nick Pillitteri
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU General Public License for more details.
//
// You should have received a copy of the GNU General Public License
// along with this program.  If not, see <http://www.gnu.org/licenses/>.
//

use crate::station::StationError;
use prometheus::{Counter, CounterVec, Encoder, Gauge, Opts, Registry, TextEncoder};
use std::error::Error;
use std::fmt;
use std::time::{SystemTime, UNIX_EPOCH};

/// Collection of Prometheus metrics updated based on the results of replacing
/// station readings and pushing them to the API.
#[derive(Clone)]
pub struct PushMetrics {
    updates: Counter,
    pushes: Counter,
    errors: CounterVec,
    last_push: Gauge,
}

impl PushMetrics {
    pub fn new(reg: &Registry) -> Result<Self, prometheus::Error> {
        let updates = Counter::new("pwspush_updates_total", "Number of attempted reading updates")?;
        let pushes = Counter::new("pwspush_pushes_total", "Number of attempted pushes to the API")?;
        let errors = CounterVec::new(
            Opts::new("pwspush_errors_total", "Number of failed updates or pushes by type"),
            &["kind"],
        )?;
        let last_push = Gauge::new("pwspush_last_push_timestamp", "Timestamp of last successful push")?;

        reg.register(Box::new(updates.clone()))?;
        reg.register(Box::new(pushes.clone()))?;
        reg.register(Box::new(errors.clone()))?;
        reg.register(Box::new(last_push.clone()))?;

        Ok(Self {
            updates,
            pushes,
            errors,
            last_push,
        })
    }

    pub fn record_update(&self, result: &Result<(), StationError>) {
        self.updates.inc();
        if let Err(e) = result {
            self.record_error(e);
        }
    }

    pub fn record_push(&self, result: &Result<String, StationError>) {
        self.pushes.inc();
        match result {
            Ok(_) => {
                // If we can't get the number of seconds since the epoch, skip the update
                let _ = SystemTime::now()
                    .duration_since(UNIX_EPOCH)
                    .map(|d| self.last_push.set(d.as_secs_f64()));
            }
            Err(e) => self.record_error(e),
        }
    }

    fn record_error(&self, e: &StationError) {
        self.errors.with_label_values(&[e.kind().as_label()]).inc();
    }
}

/// Error exposing Prometheus metrics in the text exposition format.
#[derive(Debug)]
pub enum ExpositionError {
    Encoding(&'static str, Box<dyn Error + Send + Sync + 'static>),
}

impl fmt::Display for ExpositionError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ExpositionError::Encoding(msg, ref e) => write!(f, "{}: {}", msg, e),
        }
    }
}

impl Error for ExpositionError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            ExpositionError::Encoding(_, ref e) => Some(e.as_ref()),
        }
    }
}

/// Wrapper that exposes metrics from a Prometheus registry in the text exposition format.
#[derive(Debug)]
pub struct MetricsExposition {
    registry: Registry,
}

impl MetricsExposition {
    pub fn new(registry: Registry) -> Self {
        Self { registry }
    }

    /// Gather all metrics from the registry and encode them in the Prometheus text
    /// exposition format, returning an error if metrics couldn't be encoded.
    pub fn encoded_text(&self) -> Result<Vec<u8>, ExpositionError> {
        let metric_families = self.registry.gather();
        let mut buffer = Vec::new();
        let encoder = TextEncoder::new();

        tracing::debug!(
            message = "encoding metric families to text exposition format",
            num_metrics = metric_families.len(),
        );

        encoder
            .encode(&metric_families, &mut buffer)
            .map_err(|e| ExpositionError::Encoding("unable to encode Prometheus metrics", Box::new(e)))
            .map(|_| buffer)
    }
}

#[cfg(test)]
mod test {
    use super::{MetricsExposition, PushMetrics};
    use crate::station::StationError;
    use crate::transport::{TransportError, TransportErrorKind};
    use prometheus::Registry;

    fn upload_error() -> StationError {
        StationError::Upload(TransportError::KindMsg(TransportErrorKind::Timeout, "timeout"))
    }

    #[test]
    fn test_record_update() {
        let metrics = PushMetrics::new(&Registry::new()).unwrap();

        metrics.record_update(&Ok(()));
        metrics.record_update(&Err(StationError::InvalidParameter("bogus".to_owned())));

        assert_eq!(2.0, metrics.updates.get());
        assert_eq!(1.0, metrics.errors.with_label_values(&["invalid_parameter"]).get());
    }

    #[test]
    fn test_record_push_success() {
        let metrics = PushMetrics::new(&Registry::new()).unwrap();

        metrics.record_push(&Ok("200 OK".to_owned()));

        assert_eq!(1.0, metrics.pushes.get());
        assert!(metrics.last_push.get() > 0.0);
    }

    #[test]
    fn test_record_push_failure() {
        let metrics = PushMetrics::new(&Registry::new()).unwrap();

        metrics.record_push(&Err(upload_error()));

        assert_eq!(1.0, metrics.pushes.get());
        assert_eq!(0.0, metrics.last_push.get());
        assert_eq!(1.0, metrics.errors.with_label_values(&["upload"]).get());
    }

    #[test]
    fn test_register_twice_fails() {
        let reg = Registry::new();
        assert!(PushMetrics::new(&reg).is_ok());
        assert!(PushMetrics::new(&reg).is_err());
    }

    #[test]
    fn test_encoded_text() {
        let reg = Registry::new();
        let metrics = PushMetrics::new(&reg).unwrap();
        metrics.record_push(&Err(upload_error()));

        let exposition = MetricsExposition::new(reg);
        let text = String::from_utf8(exposition.encoded_text().unwrap()).unwrap();

        assert!(text.contains("pwspush_pushes_total 1"), "unexpected output: {}", text);
        assert!(text.contains("pwspush_errors_total{kind=\"upload\"} 1"), "unexpected output: {}", text);
    }
}
