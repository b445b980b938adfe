use nalgebra::{UnitQuaternion, Vector3};

use crate::settings::Convention;

/// Standard gravity, m/s².
pub const G: f64 = 9.80665;

/// Unit gravity reaction measured by a resting accelerometer, expressed in the earth frame.
pub fn earth_up(convention: Convention) -> Vector3<f64> {
	match convention {
		Convention::Enu | Convention::Nwu => Vector3::z(),
		Convention::Ned => -Vector3::z(),
	}
}

/// Rotates an accelerometer reading (g) into the earth frame, removes gravity and converts the
/// result to m/s².
pub fn earth_acceleration(
	quaternion: &UnitQuaternion<f64>,
	accelerometer: &Vector3<f64>,
	convention: Convention,
) -> Vector3<f64> {
	(quaternion * accelerometer - earth_up(convention)).scale(G)
}

/// Accelerometer reading (g) minus the gravity predicted by `quaternion`, in the sensor frame.
pub fn linear_acceleration(
	quaternion: &UnitQuaternion<f64>,
	accelerometer: &Vector3<f64>,
	convention: Convention,
) -> Vector3<f64> {
	accelerometer - quaternion.inverse_transform_vector(&earth_up(convention))
}

#[cfg(test)]
mod tests {
	use super::*;
	use approx::assert_relative_eq;
	use std::f64::consts::FRAC_PI_2;

	#[test]
	fn resting_sensor_has_no_earth_acceleration() {
		let acceleration = earth_acceleration(&UnitQuaternion::identity(), &Vector3::z(), Convention::Nwu);
		assert_relative_eq!(acceleration, Vector3::zeros());

		let acceleration = earth_acceleration(&UnitQuaternion::identity(), &-Vector3::z(), Convention::Ned);
		assert_relative_eq!(acceleration, Vector3::zeros());
	}

	#[test]
	fn tilted_sensor_is_rotated_into_earth_frame() {
		// Sensor rolled 90° about north: its y axis points up
		let quaternion = UnitQuaternion::from_euler_angles(FRAC_PI_2, 0., 0.);
		let accelerometer = Vector3::new(0.5, 1., 0.);

		let acceleration = earth_acceleration(&quaternion, &accelerometer, Convention::Enu);
		assert_relative_eq!(acceleration, Vector3::new(0.5 * G, 0., 0.), epsilon = 1e-12);
	}

	#[test]
	fn linear_acceleration_in_sensor_frame() {
		let quaternion = UnitQuaternion::from_euler_angles(FRAC_PI_2, 0., 0.);
		let accelerometer = Vector3::new(0.5, 1., 0.);

		let acceleration = linear_acceleration(&quaternion, &accelerometer, Convention::Nwu);
		assert_relative_eq!(acceleration, Vector3::new(0.5, 0., 0.), epsilon = 1e-12);
	}
}
