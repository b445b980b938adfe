use serde::{Deserialize, Serialize};
use std::{
	error::Error,
	fmt,
	fmt::{Display, Formatter},
	str::FromStr,
};

/// Earth axes convention, i.e. which reference axes are "up" and "north".
#[derive(Debug, Copy, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Convention {
	/// X east, Y north, Z up.
	Enu,
	/// X north, Y east, Z down.
	Ned,
	/// X north, Y west, Z up.
	Nwu,
}

impl Default for Convention {
	fn default() -> Self {
		Convention::Nwu
	}
}

impl FromStr for Convention {
	type Err = SettingsError;

	fn from_str(s: &str) -> Result<Self, Self::Err> {
		Ok(match s.to_ascii_lowercase().as_str() {
			"enu" => Convention::Enu,
			"ned" => Convention::Ned,
			"nwu" => Convention::Nwu,
			_ => return Err(SettingsError::UnknownConvention(s.to_string())),
		})
	}
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AhrsSettings {
	pub convention: Convention,
	/// Weight of the accelerometer and magnetometer corrections. 0 disables them.
	pub gain: f64,
	/// Gyroscope full scale in deg/s. 0 disables the angular rate recovery flag.
	pub gyroscope_range: f64,
	/// Degrees. 0 disables acceleration rejection.
	pub acceleration_rejection: f64,
	/// Degrees. 0 disables magnetic rejection.
	pub magnetic_rejection: f64,
	/// Consecutive disagreeing samples before a sensor is rejected. 0 disables rejection.
	pub recovery_trigger_period: u32,
}

impl Default for AhrsSettings {
	fn default() -> Self {
		AhrsSettings {
			convention: Convention::Nwu,
			gain: 0.5,
			gyroscope_range: 0.0,
			acceleration_rejection: 90.0,
			magnetic_rejection: 90.0,
			recovery_trigger_period: 0,
		}
	}
}

impl AhrsSettings {
	pub fn validate(&self) -> Result<(), SettingsError> {
		fn non_negative(value: f64) -> bool {
			value.is_finite() && value >= 0.0
		}

		if !non_negative(self.gain) {
			return Err(SettingsError::InvalidGain(self.gain));
		}
		if !non_negative(self.gyroscope_range) {
			return Err(SettingsError::InvalidGyroscopeRange(self.gyroscope_range));
		}
		if !non_negative(self.acceleration_rejection) {
			return Err(SettingsError::InvalidAccelerationRejection(self.acceleration_rejection));
		}
		if !non_negative(self.magnetic_rejection) {
			return Err(SettingsError::InvalidMagneticRejection(self.magnetic_rejection));
		}
		Ok(())
	}

	/// Rejection is only meaningful when corrections are applied and a trigger period is set.
	pub(crate) fn rejection_enabled(&self) -> bool {
		self.gain > 0.0 && self.recovery_trigger_period > 0
	}
}

#[derive(Debug, Clone, PartialEq)]
pub enum SettingsError {
	InvalidGain(f64),
	InvalidGyroscopeRange(f64),
	InvalidAccelerationRejection(f64),
	InvalidMagneticRejection(f64),
	UnknownConvention(String),
}

impl Display for SettingsError {
	fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
		match self {
			SettingsError::InvalidGain(gain) => write!(f, "Invalid gain {}", gain),
			SettingsError::InvalidGyroscopeRange(range) => write!(f, "Invalid gyroscope range {} deg/s", range),
			SettingsError::InvalidAccelerationRejection(angle) => {
				write!(f, "Invalid acceleration rejection {}°", angle)
			}
			SettingsError::InvalidMagneticRejection(angle) => {
				write!(f, "Invalid magnetic rejection {}°", angle)
			}
			SettingsError::UnknownConvention(name) => {
				write!(f, "Unknown convention \"{}\" (expected enu, ned or nwu)", name)
			}
		}
	}
}

impl Error for SettingsError {}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn convention_parsing() {
		assert_eq!("NED".parse::<Convention>(), Ok(Convention::Ned));
		assert_eq!("enu".parse::<Convention>(), Ok(Convention::Enu));
		assert_eq!("Nwu".parse::<Convention>(), Ok(Convention::Nwu));
		assert_eq!(
			"xyz".parse::<Convention>(),
			Err(SettingsError::UnknownConvention("xyz".to_string()))
		);
	}

	#[test]
	fn validation() {
		assert!(AhrsSettings::default().validate().is_ok());

		let settings = AhrsSettings { gain: -0.1, ..Default::default() };
		assert_eq!(settings.validate(), Err(SettingsError::InvalidGain(-0.1)));

		let settings = AhrsSettings { gyroscope_range: f64::NAN, ..Default::default() };
		assert!(matches!(settings.validate(), Err(SettingsError::InvalidGyroscopeRange(_))));

		let settings = AhrsSettings { magnetic_rejection: -5.0, ..Default::default() };
		assert_eq!(settings.validate(), Err(SettingsError::InvalidMagneticRejection(-5.0)));
	}

	#[test]
	fn rejection_needs_gain_and_period() {
		let settings = AhrsSettings { recovery_trigger_period: 10, ..Default::default() };
		assert!(settings.rejection_enabled());

		let settings = AhrsSettings { gain: 0.0, recovery_trigger_period: 10, ..Default::default() };
		assert!(!settings.rejection_enabled());

		assert!(!AhrsSettings::default().rejection_enabled());
	}
}
