use ahrs::{AhrsSettings, CalibrationParams};
use anyhow::Context;
use nalgebra::{Matrix3, Vector3};
use serde::{Deserialize, Serialize};
use std::{
	fs::{File, OpenOptions},
	io::Write,
	path::{Path, PathBuf},
};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SensorFusionConfig {
	pub log_level_filter: String,
	/// Log files are only written when a directory is given.
	pub log_directory: Option<PathBuf>,
	/// Nominal sensor rate (Hz), used by the gyroscope offset compensation.
	pub sample_rate: u32,
	/// Applied to raw gyroscope samples before calibration.
	pub gyroscope_scale: f64,
	pub use_magnetometer: bool,
	pub ahrs: AhrsSettings,
	pub calibration_gyr: CalibrationConfig,
	pub calibration_acc: CalibrationConfig,
	pub calibration_mag: CalibrationConfig,
}

impl Default for SensorFusionConfig {
	fn default() -> Self {
		SensorFusionConfig {
			log_level_filter: String::from("info"),
			log_directory: None,
			sample_rate: 100,
			gyroscope_scale: 1.0,
			use_magnetometer: false,
			ahrs: AhrsSettings::default(),
			calibration_gyr: CalibrationConfig::default(),
			calibration_acc: CalibrationConfig::default(),
			calibration_mag: CalibrationConfig::default(),
		}
	}
}

#[derive(Debug, Copy, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CalibrationConfig {
	/// Row-major.
	pub misalignment: [[f64; 3]; 3],
	pub sensitivity: [f64; 3],
	pub offset: [f64; 3],
}

impl Default for CalibrationConfig {
	fn default() -> Self {
		CalibrationConfig {
			misalignment: [[1., 0., 0.], [0., 1., 0.], [0., 0., 1.]],
			sensitivity: [1., 1., 1.],
			offset: [0., 0., 0.],
		}
	}
}

impl From<&CalibrationConfig> for CalibrationParams {
	fn from(config: &CalibrationConfig) -> Self {
		let m = &config.misalignment;

		#[rustfmt::skip]
		let misalignment = Matrix3::new(
			m[0][0], m[0][1], m[0][2],
			m[1][0], m[1][1], m[1][2],
			m[2][0], m[2][1], m[2][2],
		);

		CalibrationParams {
			misalignment,
			sensitivity: Vector3::from(config.sensitivity),
			offset: Vector3::from(config.offset),
		}
	}
}

pub fn read(path: &Path) -> anyhow::Result<SensorFusionConfig> {
	let config_file = File::open(path)
		.with_context(|| format!("Failed to open configuration \"{}\"", path.display()))?;

	let config: SensorFusionConfig = serde_json::from_reader(config_file)
		.with_context(|| format!("Failed to parse configuration \"{}\"", path.display()))?;

	Ok(config)
}

pub fn save(config: &SensorFusionConfig, path: &Path) -> anyhow::Result<()> {
	let mut config_file = OpenOptions::new()
		.create(true)
		.write(true)
		.truncate(true)
		.open(path)
		.with_context(|| format!("Failed to create configuration \"{}\"", path.display()))?;

	writeln!(config_file, "{}", serde_json::to_string_pretty(config)?)?;

	Ok(())
}
