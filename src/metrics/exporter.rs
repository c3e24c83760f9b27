use std::io::Write;

use parking_lot::Mutex;

use crate::metrics::snapshot::PeriodicMapMetricsSnapshot;
use crate::metrics::traits::MetricsExporter;

/// Prometheus text exporter for periodic map metrics snapshots.
///
/// Writes in the Prometheus text exposition format so it can be scraped by
/// Prometheus or forwarded to an OpenTelemetry collector.
#[derive(Debug)]
pub struct PrometheusTextExporter<W: Write + Send> {
    prefix: String,
    writer: Mutex<W>,
}

impl<W: Write + Send> PrometheusTextExporter<W> {
    pub fn new(prefix: impl Into<String>, writer: W) -> Self {
        Self {
            prefix: prefix.into(),
            writer: Mutex::new(writer),
        }
    }

    /// Consume the exporter and return the underlying writer.
    pub fn into_inner(self) -> W {
        self.writer.into_inner()
    }

    fn write_metric(&self, kind: &str, name: &str, value: u64) {
        let mut writer = self.writer.lock();
        let _ = writeln!(writer, "# TYPE {} {}", name, kind);
        let _ = writeln!(writer, "{} {}", name, value);
    }

    fn write_counter(&self, suffix: &str, value: u64) {
        self.write_metric("counter", &self.metric_name(suffix), value);
    }

    fn write_gauge(&self, suffix: &str, value: u64) {
        self.write_metric("gauge", &self.metric_name(suffix), value);
    }

    fn metric_name(&self, suffix: &str) -> String {
        if self.prefix.is_empty() {
            suffix.to_string()
        } else {
            format!("{}_{}", self.prefix, suffix)
        }
    }
}

impl<W: Write + Send> MetricsExporter<PeriodicMapMetricsSnapshot> for PrometheusTextExporter<W> {
    fn export(&self, snapshot: &PeriodicMapMetricsSnapshot) {
        self.write_counter("get_calls_total", snapshot.get_calls);
        self.write_counter("get_hits_total", snapshot.get_hits);
        self.write_counter("get_misses_total", snapshot.get_misses);
        self.write_counter("put_calls_total", snapshot.put_calls);
        self.write_counter("put_updates_total", snapshot.put_updates);
        self.write_counter("put_new_total", snapshot.put_new);
        self.write_counter("remove_calls_total", snapshot.remove_calls);
        self.write_counter("remove_found_total", snapshot.remove_found);
        self.write_counter("refresh_attempts_total", snapshot.refresh_attempts);
        self.write_counter("refresh_successes_total", snapshot.refresh_successes);
        self.write_counter("refresh_failures_total", snapshot.refresh_failures);
        self.write_counter("refresh_panics_total", snapshot.refresh_panics);
        self.write_gauge(
            "last_refresh_entries",
            snapshot.last_refresh_entries as u64,
        );
        self.write_gauge("len", snapshot.len as u64);
        self.write_gauge("running", u64::from(snapshot.running));
    }
}
