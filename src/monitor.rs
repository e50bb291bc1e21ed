//! # Live Monitor Module
//!
//! Interface-side refresh loop state. It keeps its own throughput counters and
//! RSRP history and composes records straight from the provider, so it works
//! the same whether or not the sampling loop is logging.

use crate::history::{PointSliceExt, RsrpHistory, DISPLAY_WINDOW};
use crate::metrics::{MetricsComposer, RadioCapabilities, TelemetryRecord};
use crate::provider::RadioProvider;
use crate::throughput::ThroughputTracker;
use chrono::Local;
use std::fmt::Write;
use std::path::Path;
use std::sync::Arc;
use std::time::Instant;

const LABEL_WIDTH: usize = 18;

pub struct Monitor {
    provider: Arc<dyn RadioProvider>,
    composer: MetricsComposer,
    tracker: ThroughputTracker,
    history: RsrpHistory,
    latest: TelemetryRecord,
}

impl Monitor {
    pub fn new(
        provider: Arc<dyn RadioProvider>,
        capabilities: RadioCapabilities,
        history_capacity: usize,
    ) -> Self {
        let tracker = ThroughputTracker::new(provider.traffic(), Instant::now());
        Self {
            provider,
            composer: MetricsComposer::new(capabilities),
            tracker,
            history: RsrpHistory::new(history_capacity),
            latest: TelemetryRecord::new(),
        }
    }

    /// Poll the provider and compose a fresh record
    pub fn refresh(&mut self) -> &TelemetryRecord {
        let sample = self.tracker.advance(self.provider.traffic(), Instant::now());
        let snapshot = self.provider.snapshot();
        let composition = self.composer.compose(&snapshot, &sample, Local::now());

        if let Some(rsrp) = composition.rsrp_sample {
            self.history.push_now(rsrp);
        }
        self.latest = composition.record;
        &self.latest
    }

    pub fn history(&self) -> &RsrpHistory {
        &self.history
    }

    /// Text rendering of the latest record, the logging toggle and the RSRP summary
    pub fn render(&self, logging: bool, session: Option<&Path>) -> String {
        let mut out = String::new();

        let toggle = match (logging, session) {
            (true, Some(path)) => format!("ON  -> {}", path.display()),
            (true, None) => "ON  (no file)".to_string(),
            (false, _) => "OFF".to_string(),
        };
        let _ = writeln!(out, "==== KS Measuring ==== logging: {}  [l] toggle  [q] quit", toggle);

        for field in self.latest.fields() {
            let mut lines = field.value.lines();
            let first = lines.next().unwrap_or("");
            let _ = writeln!(out, "{:<width$} {}", field.name, first, width = LABEL_WIDTH);
            for line in lines {
                let _ = writeln!(out, "{:<width$} {}", "", line, width = LABEL_WIDTH);
            }
        }

        let points = self.history.last_points(DISPLAY_WINDOW);
        match (points.min_max_value(), points.first(), self.history.last_point()) {
            (Some((min, max)), Some(first), Some(latest)) => {
                let span_secs = latest.time.saturating_sub(first.time) / 1000;
                let _ = writeln!(
                    out,
                    "RSRP graph (last {} of {}, {}s): min {:.0} / max {:.0} / latest {:.0}",
                    points.len(),
                    self.history.len(),
                    span_secs,
                    min,
                    max,
                    latest.value
                );
            }
            _ => {
                let _ = writeln!(out, "RSRP graph: no data");
            }
        }
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cell::{CellReading, LteCell, RadioSnapshot};
    use crate::metrics::labels;
    use crate::throughput::TrafficTotals;
    use std::sync::atomic::{AtomicI32, Ordering};

    struct SteppingRadio {
        rsrp: AtomicI32,
    }

    impl RadioProvider for SteppingRadio {
        fn snapshot(&self) -> RadioSnapshot {
            let rsrp = self.rsrp.fetch_sub(1, Ordering::AcqRel);
            RadioSnapshot {
                cells: vec![CellReading::Lte(LteCell {
                    registered: true,
                    earfcn: Some(1300),
                    rsrp: Some(rsrp),
                    ..Default::default()
                })],
                network_type: 13,
                ..Default::default()
            }
        }

        fn traffic(&self) -> Option<TrafficTotals> {
            None
        }
    }

    fn monitor(capacity: usize) -> Monitor {
        let radio = Arc::new(SteppingRadio { rsrp: AtomicI32::new(-90) });
        Monitor::new(radio, RadioCapabilities::default(), capacity)
    }

    #[test]
    fn test_refresh_collects_history() {
        let mut monitor = monitor(50);
        assert_eq!(monitor.refresh().get(labels::RSRP), Some("-90"));
        monitor.refresh();
        monitor.refresh();

        assert_eq!(monitor.history().len(), 3);
        assert_eq!(monitor.history().last_point().map(|p| p.value), Some(-92.0));
        assert_eq!(monitor.refresh().get(labels::DL_THROUGHPUT), Some("0.00"));
    }

    #[test]
    fn test_history_capped_by_capacity() {
        let mut monitor = monitor(4);
        for _ in 0..10 {
            monitor.refresh();
        }
        assert_eq!(monitor.history().len(), 4);
    }

    #[test]
    fn test_render_lists_fields_and_summary() {
        let mut monitor = monitor(50);
        monitor.refresh();
        monitor.refresh();

        let text = monitor.render(true, Some(Path::new("KSM_20240501_120000.csv")));
        assert!(text.contains("logging: ON  -> KSM_20240501_120000.csv"));
        assert!(text.contains("Band"));
        assert!(text.contains("RSRP graph (last 2 of 2, "));
        assert!(text.contains("min -91 / max -90 / latest -91"));

        let idle = monitor.render(false, None);
        assert!(idle.contains("logging: OFF"));
    }

    #[test]
    fn test_render_summarises_the_display_window() {
        let mut monitor = monitor(DISPLAY_WINDOW + 10);
        for _ in 0..DISPLAY_WINDOW + 5 {
            monitor.refresh();
        }

        let text = monitor.render(false, None);
        assert!(text.contains(&format!("RSRP graph (last {} of {}, ", DISPLAY_WINDOW, DISPLAY_WINDOW + 5)));
        assert!(text.contains("min -144 / max -95 / latest -144"));
    }

    #[test]
    fn test_render_without_data() {
        let monitor = monitor(50);
        assert!(monitor.render(false, None).contains("RSRP graph: no data"));
    }
}
