//! Attitude and heading reference system: calibration, gyroscope offset compensation and the
//! fusion filter turning angular rate, acceleration and magnetic field samples into an
//! orientation.

pub use crate::acceleration::{earth_acceleration, earth_up, linear_acceleration, G};
pub use crate::calibration::{calibrate, CalibrationParams};
pub use crate::euler::RollPitchYaw;
pub use crate::fusion::{AhrsError, AhrsFlags, AhrsInternalStates, FusionAhrs, INITIALISATION_SAMPLES, MAX_TIME_STEP};
pub use crate::offset::GyroscopeOffset;
pub use crate::settings::{AhrsSettings, Convention, SettingsError};

mod acceleration;
mod calibration;
mod euler;
mod fusion;
mod offset;
mod settings;
