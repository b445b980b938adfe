use std::time::Duration;

use crate::node::SharedFusion;
use crate::output::Output;
use crate::traits::Monitor;

/// Publishes AHRS flags and internal states at about 30 Hz.
pub struct DiagnosticsMonitor {
	fusion: SharedFusion,
}

impl DiagnosticsMonitor {
	pub fn new(fusion: SharedFusion) -> Self {
		DiagnosticsMonitor { fusion }
	}
}

impl Monitor<Output> for DiagnosticsMonitor {
	const PERIOD: Duration = Duration::from_millis(33);

	fn monitor(&mut self) -> Output {
		Output::Diagnostics(self.fusion.lock().diagnostics())
	}
}
