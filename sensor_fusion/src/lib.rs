#[macro_use]
extern crate anyhow;

#[macro_use]
extern crate log;

pub mod config;
pub mod fusion;
pub mod input;
pub mod input_controllers;
pub mod monitors;
pub mod node;
pub mod output;
pub mod output_controllers;
pub mod traits;

pub use crate::config::SensorFusionConfig;
pub use crate::fusion::SensorFusion;
pub use crate::input::{Input, Setting};
pub use crate::node::{FusionNode, SharedFusion};
pub use crate::output::{Diagnostics, FusedOutput, Output};
pub use crate::traits::*;
