use crossbeam_channel::{Receiver, Sender};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::fusion::SensorFusion;
use crate::input::Input;
use crate::monitors::diagnostics_monitor::DiagnosticsMonitor;
use crate::output::Output;
use crate::traits::{Monitor, MonitorHandle};

/// Sensor fusion shared between the input thread and the diagnostics monitor.
#[derive(Clone)]
pub struct SharedFusion(Arc<Mutex<SensorFusion>>);

impl SharedFusion {
	pub fn new(fusion: SensorFusion) -> Self {
		SharedFusion(Arc::new(Mutex::new(fusion)))
	}

	/// Poisoning is ignored.
	pub fn lock(&self) -> MutexGuard<'_, SensorFusion> {
		self.0.lock().unwrap_or_else(PoisonError::into_inner)
	}
}

/// Dispatches host inputs to the sensor fusion, in arrival order.
pub struct FusionNode {
	fusion: SharedFusion,
	output_sender: Sender<Output>,
	monitor: Option<MonitorHandle>,
}

impl FusionNode {
	pub fn new(fusion: SensorFusion, output_sender: Sender<Output>) -> Self {
		FusionNode {
			fusion: SharedFusion::new(fusion),
			output_sender,
			monitor: None,
		}
	}

	pub fn fusion(&self) -> &SharedFusion {
		&self.fusion
	}

	pub fn handle(&mut self, input: Input) {
		match input {
			Input::Gyroscope((gyroscope, instant)) => {
				let fused = self.fusion.lock().gyroscope(&gyroscope, instant);

				if let Some(fused) = fused {
					if self.output_sender.send(Output::Fused(fused)).is_err() {
						warn!("Output closed, dropping fused sample");
					}
				}
			}
			Input::Accelerometer(accelerometer) => self.fusion.lock().accelerometer(&accelerometer),
			Input::Magnetometer(magnetometer) => self.fusion.lock().magnetometer(&magnetometer),
			Input::Setup(instant) => {
				self.fusion.lock().setup(instant);

				if self.monitor.is_none() {
					self.monitor = Some(DiagnosticsMonitor::new(self.fusion.clone())
						.spawn(self.output_sender.clone()));
				}

				info!("Sensor fusion set up");
			}
			Input::Reset => {
				self.fusion.lock().reset();
				info!("Sensor fusion reset");
			}
			Input::Setting(setting) => match self.fusion.lock().apply(setting) {
				Ok(()) => info!("Applied {:?}", setting),
				Err(e) => warn!("Rejected {:?}: {}", setting, e),
			},
		}
	}

	/// Handles inputs until the input channel closes, then stops the diagnostics monitor.
	pub fn run(mut self, input_receiver: Receiver<Input>) {
		for input in input_receiver.iter() {
			self.handle(input);
		}

		if let Some(monitor) = self.monitor.take() {
			monitor.stop();
		}
	}
}
