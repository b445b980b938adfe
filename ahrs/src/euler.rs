use nalgebra::{RealField, UnitQuaternion};
use serde::{Deserialize, Serialize};
use std::ops::Sub;

/// Tait-Bryan angles (Z-Y-X), in degrees when produced from a quaternion.
#[derive(Debug, Serialize, Deserialize, Copy, Clone, PartialEq)]
pub struct RollPitchYaw<N> {
	pub roll: N,
	pub pitch: N,
	pub yaw: N,
}

impl<N: RealField> From<(N, N, N)> for RollPitchYaw<N> {
	fn from((roll, pitch, yaw): (N, N, N)) -> Self {
		RollPitchYaw { roll, pitch, yaw }
	}
}

impl<N: RealField> Sub for RollPitchYaw<N> {
	type Output = Self;

	fn sub(self, rhs: Self) -> Self::Output {
		RollPitchYaw {
			roll: self.roll - rhs.roll,
			pitch: self.pitch - rhs.pitch,
			yaw: self.yaw - rhs.yaw,
		}
	}
}

impl RollPitchYaw<f64> {
	pub fn from_quaternion(quaternion: &UnitQuaternion<f64>) -> Self {
		let q = quaternion.quaternion();
		let half_minus_qy_squared = 0.5 - q.j * q.j;

		RollPitchYaw {
			roll: (q.w * q.i + q.j * q.k).atan2(half_minus_qy_squared - q.i * q.i).to_degrees(),
			pitch: clamped_asin(2.0 * (q.w * q.j - q.k * q.i)).to_degrees(),
			yaw: (q.w * q.k + q.i * q.j).atan2(half_minus_qy_squared - q.k * q.k).to_degrees(),
		}
	}

	pub fn to_quaternion(&self) -> UnitQuaternion<f64> {
		UnitQuaternion::from_euler_angles(
			self.roll.to_radians(),
			self.pitch.to_radians(),
			self.yaw.to_radians(),
		)
	}
}

/// `asin` that saturates instead of returning NaN when rounding pushes the argument past ±1.
pub(crate) fn clamped_asin(value: f64) -> f64 {
	value.max(-1.0).min(1.0).asin()
}

#[cfg(test)]
mod tests {
	use super::*;
	use assert_approx_eq::assert_approx_eq;
	use nalgebra::Quaternion;

	#[test]
	fn identity() {
		let angles = RollPitchYaw::from_quaternion(&UnitQuaternion::identity());
		assert_eq!(angles, RollPitchYaw { roll: 0., pitch: 0., yaw: 0. });
	}

	#[test]
	fn matches_nalgebra_convention() {
		let quaternion = UnitQuaternion::from_euler_angles(0.3, -0.7, 2.1);
		let angles = RollPitchYaw::from_quaternion(&quaternion);

		assert_approx_eq!(angles.roll, 0.3f64.to_degrees(), 1e-9);
		assert_approx_eq!(angles.pitch, (-0.7f64).to_degrees(), 1e-9);
		assert_approx_eq!(angles.yaw, 2.1f64.to_degrees(), 1e-9);
	}

	#[test]
	fn gimbal_lock_does_not_produce_nan() {
		// Slightly non-unit quaternion whose pitch argument overshoots 1
		let half = std::f64::consts::FRAC_1_SQRT_2 + 1e-9;
		let quaternion = UnitQuaternion::new_unchecked(Quaternion::new(half, 0., half, 0.));

		let angles = RollPitchYaw::from_quaternion(&quaternion);
		assert!(!angles.pitch.is_nan());
		assert_approx_eq!(angles.pitch, 90., 1e-6);
	}

	#[test]
	fn difference() {
		let a: RollPitchYaw<f64> = (10., 20., 30.).into();
		let b: RollPitchYaw<f64> = (1., 2., 3.).into();
		assert_eq!(a - b, RollPitchYaw { roll: 9., pitch: 18., yaw: 27. });
	}
}
