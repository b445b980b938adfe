use ahrs::{
	calibrate, AhrsSettings, CalibrationParams, FusionAhrs, GyroscopeOffset, SettingsError, MAX_TIME_STEP,
};
use nalgebra::Vector3;
use std::time::Instant;

use crate::config::SensorFusionConfig;
use crate::input::Setting;
use crate::output::{Diagnostics, FusedOutput};

/// Sensor pipeline: gyroscope scale, calibration, offset compensation, then AHRS update.
///
/// Accelerometer and magnetometer samples are latched and consumed by the next gyroscope sample,
/// whose arrival time sets the integration step.
pub struct SensorFusion {
	ahrs: FusionAhrs,
	offset: GyroscopeOffset,
	sample_rate: u32,
	gyroscope_scale: f64,
	use_magnetometer: bool,
	gyroscope_calibration: CalibrationParams,
	accelerometer_calibration: CalibrationParams,
	magnetometer_calibration: CalibrationParams,
	accelerometer: Vector3<f64>,
	magnetometer: Option<Vector3<f64>>,
	last_gyroscope_instant: Option<Instant>,
}

impl SensorFusion {
	pub fn new(config: &SensorFusionConfig) -> Result<Self, SettingsError> {
		Ok(SensorFusion {
			ahrs: FusionAhrs::new(config.ahrs)?,
			offset: GyroscopeOffset::new(config.sample_rate),
			sample_rate: config.sample_rate,
			gyroscope_scale: config.gyroscope_scale,
			use_magnetometer: config.use_magnetometer,
			gyroscope_calibration: CalibrationParams::from(&config.calibration_gyr),
			accelerometer_calibration: CalibrationParams::from(&config.calibration_acc),
			magnetometer_calibration: CalibrationParams::from(&config.calibration_mag),
			accelerometer: Vector3::zeros(),
			magnetometer: None,
			last_gyroscope_instant: None,
		})
	}

	/// Restarts offset compensation and the AHRS, and starts the sample clock at `instant`.
	pub fn setup(&mut self, instant: Instant) {
		self.offset = GyroscopeOffset::new(self.sample_rate);
		self.ahrs.reset();
		self.last_gyroscope_instant = Some(instant);
	}

	pub fn reset(&mut self) {
		self.ahrs.reset();
	}

	pub fn settings(&self) -> AhrsSettings {
		self.ahrs.settings()
	}

	/// Applies a setting and resets the AHRS. Invalid values leave the current settings in place.
	pub fn apply(&mut self, setting: Setting) -> anyhow::Result<()> {
		let mut settings = self.ahrs.settings();

		match setting {
			Setting::Convention(convention) => settings.convention = convention,
			Setting::Gain(gain) => settings.gain = gain,
			Setting::GyroscopeRange(range) => settings.gyroscope_range = range,
			Setting::AccelerationRejection(rejection) => settings.acceleration_rejection = rejection,
			Setting::MagneticRejection(rejection) => settings.magnetic_rejection = rejection,
			Setting::RecoveryTriggerPeriod(period) => settings.recovery_trigger_period = period,
			Setting::GyroscopeScale(scale) => {
				ensure!(scale.is_finite(), "Invalid gyroscope scale {}", scale);
				self.gyroscope_scale = scale;
			}
			Setting::UseMagnetometer(use_magnetometer) => self.use_magnetometer = use_magnetometer,
		}

		self.ahrs.apply_settings(settings)?;
		Ok(())
	}

	pub fn accelerometer(&mut self, raw: &Vector3<f64>) {
		if is_finite(raw) {
			self.accelerometer = calibrate(raw, &self.accelerometer_calibration);
		} else {
			debug!("Dropping non-finite accelerometer sample {:?}", raw);
		}
	}

	pub fn magnetometer(&mut self, raw: &Vector3<f64>) {
		if is_finite(raw) {
			self.magnetometer = Some(calibrate(raw, &self.magnetometer_calibration));
		} else {
			debug!("Dropping non-finite magnetometer sample {:?}", raw);
		}
	}

	/// Runs one filter step. Returns `None` when the sample only starts the clock or is dropped.
	pub fn gyroscope(&mut self, raw: &Vector3<f64>, instant: Instant) -> Option<FusedOutput> {
		let last_instant = match self.last_gyroscope_instant.replace(instant) {
			Some(last_instant) => last_instant,
			None => {
				debug!("First gyroscope sample starts the clock");
				return None;
			}
		};

		let time_step = instant.saturating_duration_since(last_instant).as_secs_f64();

		if !(time_step > 0. && time_step <= MAX_TIME_STEP) {
			debug!("Dropping gyroscope sample with time step {:.3} s", time_step);
			return None;
		}

		if !is_finite(raw) {
			debug!("Dropping non-finite gyroscope sample {:?}", raw);
			return None;
		}

		let gyroscope = calibrate(&raw.scale(self.gyroscope_scale), &self.gyroscope_calibration);
		let gyroscope = self.offset.update(gyroscope);

		let result = match self.magnetometer.as_ref() {
			Some(magnetometer) if self.use_magnetometer => {
				self.ahrs.update(&gyroscope, &self.accelerometer, Some(magnetometer), time_step)
			}
			_ => self.ahrs.update_no_magnetometer(&gyroscope, &self.accelerometer, time_step),
		};

		if let Err(e) = result {
			debug!("Dropping gyroscope sample: {}", e);
			return None;
		}

		let quaternion = self.ahrs.quaternion();
		let earth_acceleration = self.ahrs.earth_acceleration();

		Some(FusedOutput {
			quaternion: [quaternion.w, quaternion.i, quaternion.j, quaternion.k],
			euler: self.ahrs.euler(),
			earth_acceleration: [earth_acceleration.x, earth_acceleration.y, earth_acceleration.z],
			time_step_ms: time_step * 1000.,
		})
	}

	pub fn diagnostics(&self) -> Diagnostics {
		Diagnostics {
			flags: self.ahrs.flags(),
			states: self.ahrs.internal_states(),
		}
	}
}

fn is_finite(vector: &Vector3<f64>) -> bool {
	vector.iter().all(|x| x.is_finite())
}
