use nalgebra::{Matrix3, Vector3};

/// Linear correction of a triaxial sensor.
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct CalibrationParams {
	pub misalignment: Matrix3<f64>,
	pub sensitivity: Vector3<f64>,
	pub offset: Vector3<f64>,
}

impl Default for CalibrationParams {
	fn default() -> Self {
		CalibrationParams {
			misalignment: Matrix3::identity(),
			sensitivity: Vector3::new(1., 1., 1.),
			offset: Vector3::zeros(),
		}
	}
}

impl CalibrationParams {
	/// Hard and soft iron correction of a magnetometer.
	pub fn magnetic(soft_iron: Matrix3<f64>, hard_iron: Vector3<f64>) -> Self {
		CalibrationParams {
			misalignment: soft_iron,
			sensitivity: Vector3::new(1., 1., 1.),
			offset: hard_iron,
		}
	}
}

/// `misalignment · (sensitivity ⊙ (raw − offset))`
pub fn calibrate(raw: &Vector3<f64>, params: &CalibrationParams) -> Vector3<f64> {
	params.misalignment * (raw - params.offset).component_mul(&params.sensitivity)
}
