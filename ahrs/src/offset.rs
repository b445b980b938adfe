use nalgebra::Vector3;
use std::f64::consts::PI;

const CUTOFF_FREQUENCY: f64 = 0.02; // Hz
const TIMEOUT: u32 = 5; // s
const THRESHOLD: f64 = 3.0; // deg/s

/// Tracks and removes a slowly varying gyroscope bias.
///
/// The bias is only learned once every axis has stayed under `THRESHOLD` for `TIMEOUT` seconds,
/// so real rotations never leak into the estimate.
#[derive(Debug, Clone)]
pub struct GyroscopeOffset {
	filter_coefficient: f64,
	timeout: u32,
	timer: u32,
	offset: Vector3<f64>,
}

impl GyroscopeOffset {
	pub fn new(sample_rate: u32) -> Self {
		let sample_rate = sample_rate.max(1);

		GyroscopeOffset {
			filter_coefficient: 2.0 * PI * CUTOFF_FREQUENCY / sample_rate as f64,
			timeout: TIMEOUT.saturating_mul(sample_rate),
			timer: 0,
			offset: Vector3::zeros(),
		}
	}

	/// Returns the bias corrected angular rate (deg/s).
	pub fn update(&mut self, gyroscope: Vector3<f64>) -> Vector3<f64> {
		let gyroscope = gyroscope - self.offset;

		if gyroscope.amax() > THRESHOLD {
			self.timer = 0;
			return gyroscope;
		}

		if self.timer < self.timeout {
			self.timer += 1;
			return gyroscope;
		}

		self.offset += gyroscope.scale(self.filter_coefficient);
		gyroscope
	}

	pub fn offset(&self) -> Vector3<f64> {
		self.offset
	}

	pub fn reset(&mut self) {
		self.timer = 0;
		self.offset = Vector3::zeros();
	}
}
