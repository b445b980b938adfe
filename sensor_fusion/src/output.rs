use ahrs::{AhrsFlags, AhrsInternalStates, RollPitchYaw};
use serde::Serialize;

/// One JSON object per line on the output stream, tagged by variant name.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Output {
	Fused(FusedOutput),
	Diagnostics(Diagnostics),
}

/// Emitted after every accepted gyroscope sample.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FusedOutput {
	/// `[w, x, y, z]`
	pub quaternion: [f64; 4],
	/// Degrees.
	pub euler: RollPitchYaw<f64>,
	/// m/s², gravity removed.
	pub earth_acceleration: [f64; 3],
	pub time_step_ms: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Diagnostics {
	pub flags: AhrsFlags,
	pub states: AhrsInternalStates,
}
