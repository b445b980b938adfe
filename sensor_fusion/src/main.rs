#[macro_use]
extern crate anyhow;

#[macro_use]
extern crate log;

use crossbeam_channel::unbounded;
use std::{
	io::{self, BufReader},
	path::Path,
};

use black_box::BlackBox;
use sensor_fusion::input_controllers::line_input_controller::LineInputController;
use sensor_fusion::output_controllers::json_output_controller::JsonOutputController;
use sensor_fusion::*;

fn main() -> anyhow::Result<()> {
	// Command line arguments
	const CONFIG_ARG: &str = "config";
	const WRITE_CONFIG_ARG: &str = "write-config";

	let args = clap::Command::new("Sensor fusion")
		.version(env!("CARGO_PKG_VERSION"))
		.author("Vincent Leporcher <vincent.leporcher@telecom-paris.fr>")
		.about("Fuses gyroscope, accelerometer and magnetometer lines from stdin into JSON orientation lines")
		.arg(clap::Arg::new(CONFIG_ARG)
			.long("config")
			.short('c')
			.value_name("FILE")
			.help("JSON configuration file")
			.takes_value(true))
		.arg(clap::Arg::new(WRITE_CONFIG_ARG)
			.long("write-config")
			.value_name("FILE")
			.help("Write the default configuration to FILE and exit")
			.takes_value(true))
		.get_matches();

	if let Some(path) = args.value_of(WRITE_CONFIG_ARG) {
		config::save(&SensorFusionConfig::default(), Path::new(path))?;
		return Ok(());
	}

	// Configuration
	let config = match args.value_of(CONFIG_ARG) {
		Some(path) => config::read(Path::new(path))?,
		None => SensorFusionConfig::default(),
	};

	// Log
	let level_filter = black_box::parse_level_filter(&config.log_level_filter)
		.ok_or_else(|| anyhow!("Failed to parse log level filter \"{}\"", config.log_level_filter))?;

	BlackBox::new(config.log_directory.as_deref())?
		.spawn(level_filter)
		.map_err(|e| anyhow!("Failed to install logger: {}", e))?;

	info!("Sensor fusion {}", env!("CARGO_PKG_VERSION"));
	debug!("{:?}", config);

	let fusion = SensorFusion::new(&config)?;

	// Output controller
	let (output_sender,
		output_receiver) = unbounded::<Output>();

	let output_thread = JsonOutputController::new(io::stdout())
		.spawn(output_receiver);

	// Input controller
	let (input_sender,
		input_receiver) = unbounded::<Input>();

	LineInputController::new(BufReader::new(io::stdin()))
		.spawn(input_sender);

	// Runs until stdin is closed
	FusionNode::new(fusion, output_sender)
		.run(input_receiver);

	output_thread
		.join()
		.map_err(|_| anyhow!("Output thread panicked"))?;

	info!("Sensor fusion stopped");
	// Blocks until the log is written
	log::logger().flush();

	Ok(())
}
