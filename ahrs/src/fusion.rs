use nalgebra::{Quaternion, UnitQuaternion, Vector3};
use serde::{Deserialize, Serialize};
use std::{
	error::Error,
	fmt,
	fmt::{Display, Formatter},
};

use crate::acceleration;
use crate::euler::RollPitchYaw;
use crate::settings::{AhrsSettings, Convention, SettingsError};

/// Gain every (re)initialisation starts from, for a fast first convergence.
const INITIAL_GAIN: f64 = 10.0;
/// Number of samples taken by the ramp from `INITIAL_GAIN` to the configured gain.
pub const INITIALISATION_SAMPLES: u32 = 300;
/// Longest accepted time step (s). A longer gap means the stream was paused.
pub const MAX_TIME_STEP: f64 = 2.0;
const GYROSCOPE_RANGE_FACTOR: f64 = 0.98;
const NORMALIZATION_EPSILON: f64 = 1e-12;

/// Reason a sample was dropped. The filter state is untouched whenever one is returned.
#[derive(Debug, Clone, PartialEq)]
pub enum AhrsError {
	InvalidTimeStep(f64),
	NonFiniteInput,
}

impl Display for AhrsError {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			AhrsError::InvalidTimeStep(dt) => write!(f, "Invalid time step {} s", dt),
			AhrsError::NonFiniteInput => write!(f, "Non-finite sensor input"),
		}
	}
}

impl Error for AhrsError {}

#[derive(Debug, Default, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AhrsFlags {
	pub initialising: bool,
	pub angular_rate_recovery: bool,
	pub acceleration_recovery: bool,
	pub magnetic_recovery: bool,
}

#[derive(Debug, Default, Copy, Clone, PartialEq, Serialize, Deserialize)]
pub struct AhrsInternalStates {
	/// Angle between measured and predicted gravity, degrees.
	pub acceleration_error: f64,
	pub accelerometer_ignored: bool,
	/// Progress of the acceleration recovery timer toward the trigger period, 0 to 1.
	pub acceleration_recovery_trigger: f64,
	/// Angle between measured and predicted magnetic field, degrees.
	pub magnetic_error: f64,
	pub magnetometer_ignored: bool,
	pub magnetic_recovery_trigger: f64,
}

/// Accept/reject bookkeeping of one aiding sensor.
#[derive(Debug, Clone)]
struct Rejection {
	feedback: Vector3<f64>,
	error: f64,
	ignored: bool,
	recovery_timer: u32,
}

impl Rejection {
	fn new() -> Self {
		Rejection {
			feedback: Vector3::zeros(),
			error: 0.0,
			ignored: false,
			recovery_timer: 0,
		}
	}

	/// Compares a normalised measurement with the half scale reference predicted by the
	/// filter. Returns the feedback to apply, zero when the sensor is rejected.
	fn evaluate(&mut self,
				sensor: &Vector3<f64>,
				half_reference: &Vector3<f64>,
				threshold: Option<f64>,
				period: u32,
				initialising: bool) -> Vector3<f64> {
		self.feedback = feedback(sensor, half_reference);
		self.error = sensor.angle(half_reference).to_degrees();

		match threshold {
			Some(threshold) if !initialising && self.error > threshold => {
				self.recovery_timer = self.recovery_timer.saturating_add(1);
			}
			_ => self.recovery_timer = 0,
		}

		self.ignored = self.recovery_timer > period;

		if self.ignored {
			Vector3::zeros()
		} else {
			self.feedback
		}
	}

	/// No usable measurement this sample. The error reads zero until the next measurement.
	fn skip(&mut self) {
		self.feedback = Vector3::zeros();
		self.error = 0.0;
		self.ignored = true;
	}

	fn recovering(&self, period: u32) -> bool {
		self.recovery_timer > period
	}

	fn trigger(&self, period: u32) -> f64 {
		if period == 0 {
			0.0
		} else {
			self.recovery_timer.min(period) as f64 / period as f64
		}
	}
}

/// `sensor × reference`, at full magnitude once the error exceeds 90° so that the correction
/// does not fade out.
fn feedback(sensor: &Vector3<f64>, reference: &Vector3<f64>) -> Vector3<f64> {
	let cross = sensor.cross(reference);

	if sensor.dot(reference) < 0.0 {
		cross.try_normalize(NORMALIZATION_EPSILON).unwrap_or(cross)
	} else {
		cross
	}
}

fn is_finite(vector: &Vector3<f64>) -> bool {
	vector.iter().all(|component| component.is_finite())
}

/// Complementary filter fusing angular rate with gravity and magnetic field directions.
///
/// The quaternion rotates sensor frame vectors into the earth frame selected by the
/// convention.
#[derive(Debug, Clone)]
pub struct FusionAhrs {
	settings: AhrsSettings,
	/// Angular rate (deg/s) above which the angular rate recovery flag is raised.
	gyroscope_range: f64,
	acceleration_rejection: Option<f64>,
	magnetic_rejection: Option<f64>,
	quaternion: Quaternion<f64>,
	accelerometer: Vector3<f64>,
	initialising: bool,
	ramped_gain: f64,
	ramped_gain_step: f64,
	angular_rate_recovery: bool,
	acceleration: Rejection,
	magnetic: Rejection,
}

impl Default for FusionAhrs {
	fn default() -> Self {
		let mut ahrs = FusionAhrs {
			settings: AhrsSettings::default(),
			gyroscope_range: f64::INFINITY,
			acceleration_rejection: None,
			magnetic_rejection: None,
			quaternion: Quaternion::identity(),
			accelerometer: Vector3::zeros(),
			initialising: true,
			ramped_gain: INITIAL_GAIN,
			ramped_gain_step: 0.0,
			angular_rate_recovery: false,
			acceleration: Rejection::new(),
			magnetic: Rejection::new(),
		};
		ahrs.process_settings();
		ahrs
	}
}

impl FusionAhrs {
	pub fn new(settings: AhrsSettings) -> Result<Self, SettingsError> {
		let mut ahrs = FusionAhrs::default();
		ahrs.apply_settings(settings)?;
		Ok(ahrs)
	}

	pub fn settings(&self) -> AhrsSettings {
		self.settings
	}

	/// Replaces the settings and restarts the filter. Refused settings leave everything as is.
	pub fn apply_settings(&mut self, settings: AhrsSettings) -> Result<(), SettingsError> {
		settings.validate()?;

		self.settings = settings;
		self.process_settings();
		self.reset();

		Ok(())
	}

	fn process_settings(&mut self) {
		let settings = self.settings;

		self.gyroscope_range = if settings.gyroscope_range == 0.0 {
			f64::INFINITY
		} else {
			GYROSCOPE_RANGE_FACTOR * settings.gyroscope_range
		};

		let threshold = |angle: f64| {
			if settings.rejection_enabled() && angle > 0.0 {
				Some(angle)
			} else {
				None
			}
		};
		self.acceleration_rejection = threshold(settings.acceleration_rejection);
		self.magnetic_rejection = threshold(settings.magnetic_rejection);

		self.ramped_gain_step = (settings.gain - INITIAL_GAIN) / INITIALISATION_SAMPLES as f64;
	}

	/// Restarts the filter from the identity orientation, keeping the settings.
	pub fn reset(&mut self) {
		self.quaternion = Quaternion::identity();
		self.accelerometer = Vector3::zeros();
		self.initialising = true;
		self.ramped_gain = INITIAL_GAIN;
		self.angular_rate_recovery = false;
		self.acceleration = Rejection::new();
		self.magnetic = Rejection::new();
	}

	/// `gyroscope` in deg/s, `accelerometer` in g, `magnetometer` in any unit, `dt` in seconds.
	pub fn update(&mut self,
				  gyroscope: &Vector3<f64>,
				  accelerometer: &Vector3<f64>,
				  magnetometer: Option<&Vector3<f64>>,
				  dt: f64) -> Result<(), AhrsError> {
		if !dt.is_finite() || dt <= 0.0 || dt > MAX_TIME_STEP {
			return Err(AhrsError::InvalidTimeStep(dt));
		}

		if !is_finite(gyroscope) || !is_finite(accelerometer) || !magnetometer.map_or(true, |m| is_finite(m)) {
			return Err(AhrsError::NonFiniteInput);
		}

		self.accelerometer = *accelerometer;
		self.angular_rate_recovery = gyroscope.norm() > self.gyroscope_range;

		self.ramp_gain();

		let period = self.settings.recovery_trigger_period;
		let initialising = self.initialising;
		let half_gravity = self.half_gravity();

		let half_accelerometer_feedback = match accelerometer.try_normalize(NORMALIZATION_EPSILON) {
			Some(accelerometer) => self.acceleration.evaluate(&accelerometer,
															  &half_gravity,
															  self.acceleration_rejection,
															  period,
															  initialising),
			None => {
				self.acceleration.skip();
				Vector3::zeros()
			}
		};

		// Only the flux component orthogonal to gravity is compared, so that heading
		// corrections never tilt the estimate.
		let magnetometer = magnetometer
			.and_then(|magnetometer| half_gravity.cross(magnetometer).try_normalize(NORMALIZATION_EPSILON));

		let half_magnetometer_feedback = match magnetometer {
			Some(magnetometer) => {
				let half_magnetic = self.half_magnetic();
				self.magnetic.evaluate(&magnetometer,
									   &half_magnetic,
									   self.magnetic_rejection,
									   period,
									   initialising)
			}
			None => {
				self.magnetic.skip();
				Vector3::zeros()
			}
		};

		let half_gyroscope = gyroscope.scale(0.5f64.to_radians());
		let adjusted_half_gyroscope = half_gyroscope
			+ (half_accelerometer_feedback + half_magnetometer_feedback).scale(self.ramped_gain);

		// Integrate rate of change of quaternion
		let q = self.quaternion;
		self.quaternion = (q + q * Quaternion::from_parts(0.0, adjusted_half_gyroscope.scale(dt))).normalize();

		Ok(())
	}

	/// Same as `update` without magnetometer. The heading is held at zero while initialising.
	pub fn update_no_magnetometer(&mut self,
								  gyroscope: &Vector3<f64>,
								  accelerometer: &Vector3<f64>,
								  dt: f64) -> Result<(), AhrsError> {
		self.update(gyroscope, accelerometer, None, dt)?;

		if self.initialising {
			self.set_heading(0.0);
		}

		Ok(())
	}

	/// Rotates the estimate about the earth vertical so that its yaw becomes `heading` degrees.
	pub fn set_heading(&mut self, heading: f64) {
		let q = self.quaternion;
		let yaw = (q.w * q.k + q.i * q.j).atan2(0.5 - q.j * q.j - q.k * q.k);
		let half_yaw_minus_heading = 0.5 * (yaw - heading.to_radians());

		let rotation = Quaternion::new(half_yaw_minus_heading.cos(), 0.0, 0.0, -half_yaw_minus_heading.sin());
		self.quaternion = (rotation * q).normalize();
	}

	fn ramp_gain(&mut self) {
		if !self.initialising {
			return;
		}

		let gain = self.settings.gain;
		if gain == 0.0 || (gain - self.ramped_gain).abs() <= self.ramped_gain_step.abs() {
			self.ramped_gain = gain;
			self.initialising = false;
		} else {
			self.ramped_gain += self.ramped_gain_step;
		}
	}

	/// Earth "up" expressed in the sensor frame, scaled by 0.5.
	fn half_gravity(&self) -> Vector3<f64> {
		let q = &self.quaternion;

		match self.settings.convention {
			// Third column of the transposed rotation matrix, scaled by 0.5
			Convention::Nwu | Convention::Enu => Vector3::new(
				q.i * q.k - q.w * q.j,
				q.j * q.k + q.w * q.i,
				q.w * q.w - 0.5 + q.k * q.k,
			),
			// Same, scaled by -0.5
			Convention::Ned => Vector3::new(
				q.w * q.j - q.i * q.k,
				-(q.j * q.k + q.w * q.i),
				0.5 - q.w * q.w - q.k * q.k,
			),
		}
	}

	/// Earth axis that `up × magnetic field` points along, in the sensor frame, scaled by 0.5.
	fn half_magnetic(&self) -> Vector3<f64> {
		let q = &self.quaternion;

		match self.settings.convention {
			// West: second column of the transposed rotation matrix, scaled by 0.5
			Convention::Nwu => Vector3::new(
				q.i * q.j + q.w * q.k,
				q.w * q.w - 0.5 + q.j * q.j,
				q.j * q.k - q.w * q.i,
			),
			// West: first column, scaled by -0.5
			Convention::Enu => Vector3::new(
				0.5 - q.w * q.w - q.i * q.i,
				q.w * q.k - q.i * q.j,
				-(q.i * q.k + q.w * q.j),
			),
			// West: second column, scaled by -0.5
			Convention::Ned => Vector3::new(
				-(q.i * q.j + q.w * q.k),
				0.5 - q.w * q.w - q.j * q.j,
				q.w * q.i - q.j * q.k,
			),
		}
	}

	pub fn quaternion(&self) -> UnitQuaternion<f64> {
		// Renormalised after every update
		UnitQuaternion::new_unchecked(self.quaternion)
	}

	pub fn euler(&self) -> RollPitchYaw<f64> {
		RollPitchYaw::from_quaternion(&self.quaternion())
	}

	/// Gravity free acceleration of the last sample in the earth frame, m/s².
	pub fn earth_acceleration(&self) -> Vector3<f64> {
		acceleration::earth_acceleration(&self.quaternion(), &self.accelerometer, self.settings.convention)
	}

	/// Gravity free acceleration of the last sample in the sensor frame, g.
	pub fn linear_acceleration(&self) -> Vector3<f64> {
		acceleration::linear_acceleration(&self.quaternion(), &self.accelerometer, self.settings.convention)
	}

	pub fn is_initialising(&self) -> bool {
		self.initialising
	}

	pub fn flags(&self) -> AhrsFlags {
		let period = self.settings.recovery_trigger_period;

		AhrsFlags {
			initialising: self.initialising,
			angular_rate_recovery: self.angular_rate_recovery,
			acceleration_recovery: self.acceleration.recovering(period),
			magnetic_recovery: self.magnetic.recovering(period),
		}
	}

	pub fn internal_states(&self) -> AhrsInternalStates {
		let period = self.settings.recovery_trigger_period;

		AhrsInternalStates {
			acceleration_error: self.acceleration.error,
			accelerometer_ignored: self.acceleration.ignored,
			acceleration_recovery_trigger: self.acceleration.trigger(period),
			magnetic_error: self.magnetic.error,
			magnetometer_ignored: self.magnetic.ignored,
			magnetic_recovery_trigger: self.magnetic.trigger(period),
		}
	}
}
