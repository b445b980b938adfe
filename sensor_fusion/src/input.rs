use ahrs::Convention;
use anyhow::Context;
use nalgebra::Vector3;
use std::time::Instant;

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Input {
	/// Raw gyroscope sample and its arrival instant.
	Gyroscope((Vector3<f64>, Instant)),
	Accelerometer(Vector3<f64>),
	Magnetometer(Vector3<f64>),
	Setup(Instant),
	Reset,
	Setting(Setting),
}

#[derive(Debug, Copy, Clone, PartialEq)]
pub enum Setting {
	Convention(Convention),
	Gain(f64),
	GyroscopeRange(f64),
	AccelerationRejection(f64),
	MagneticRejection(f64),
	RecoveryTriggerPeriod(u32),
	GyroscopeScale(f64),
	UseMagnetometer(bool),
}

/// Parses one host message. Blank lines yield `None`.
///
/// Sensor samples are `gyro|accel|mag x y z`; extra components are ignored. Settings are
/// `<option> <value>`.
pub fn parse_line(line: &str, instant: Instant) -> anyhow::Result<Option<Input>> {
	let mut tokens = line.split_whitespace();

	let command = match tokens.next() {
		Some(command) => command,
		None => return Ok(None),
	};

	let arguments: Vec<&str> = tokens.collect();

	let input = match command {
		"gyro" | "gyroscope" => Input::Gyroscope((parse_vector(&arguments)?, instant)),
		"accel" | "accelerometer" => Input::Accelerometer(parse_vector(&arguments)?),
		"mag" | "magnetometer" => Input::Magnetometer(parse_vector(&arguments)?),
		"setup" => Input::Setup(instant),
		"reset" => Input::Reset,
		option => Input::Setting(parse_setting(option, &arguments)?),
	};

	Ok(Some(input))
}

fn parse_vector(arguments: &[&str]) -> anyhow::Result<Vector3<f64>> {
	ensure!(arguments.len() >= 3, "Expected 3 components, found {}", arguments.len());

	let component = |i: usize| -> anyhow::Result<f64> {
		arguments[i]
			.parse::<f64>()
			.with_context(|| format!("Invalid component \"{}\"", arguments[i]))
	};

	Ok(Vector3::new(component(0)?, component(1)?, component(2)?))
}

fn parse_setting(option: &str, arguments: &[&str]) -> anyhow::Result<Setting> {
	let value = *arguments
		.first()
		.ok_or_else(|| anyhow!("Missing value for \"{}\"", option))?;

	let number = || -> anyhow::Result<f64> {
		value
			.parse::<f64>()
			.with_context(|| format!("Invalid value \"{}\" for \"{}\"", value, option))
	};

	Ok(match option {
		"convention" => Setting::Convention(value.parse()?),
		"gain" => Setting::Gain(number()?),
		"gyroscopeRange" => Setting::GyroscopeRange(number()?),
		"accelerationRejection" => Setting::AccelerationRejection(number()?),
		"magneticRejection" => Setting::MagneticRejection(number()?),
		"recoveryTriggerPeriod" => Setting::RecoveryTriggerPeriod(
			value
				.parse::<u32>()
				.with_context(|| format!("Invalid sample count \"{}\"", value))?,
		),
		"gyroscopeScale" => Setting::GyroscopeScale(number()?),
		"useMagnetometer" => Setting::UseMagnetometer(parse_bool(value)?),
		_ => bail!("Unknown command \"{}\"", option),
	})
}

fn parse_bool(value: &str) -> anyhow::Result<bool> {
	match value {
		"1" | "true" | "on" => Ok(true),
		"0" | "false" | "off" => Ok(false),
		_ => Err(anyhow!("Invalid boolean \"{}\"", value)),
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn parse(line: &str) -> anyhow::Result<Option<Input>> {
		parse_line(line, Instant::now())
	}

	#[test]
	fn sensor_samples() {
		let instant = Instant::now();

		assert_eq!(
			parse_line("gyro 1 -2.5 3e-1", instant).unwrap(),
			Some(Input::Gyroscope((Vector3::new(1., -2.5, 0.3), instant)))
		);
		assert_eq!(
			parse("accel 0 0 1").unwrap(),
			Some(Input::Accelerometer(Vector3::z()))
		);
		assert_eq!(
			parse("  mag 10 20 30 40 ").unwrap(),
			Some(Input::Magnetometer(Vector3::new(10., 20., 30.)))
		);
	}

	#[test]
	fn short_or_malformed_samples_are_rejected() {
		assert!(parse("gyro 1 2").is_err());
		assert!(parse("accel").is_err());
		assert!(parse("mag 1 x 3").is_err());
	}

	#[test]
	fn commands() {
		let instant = Instant::now();

		assert_eq!(parse_line("setup", instant).unwrap(), Some(Input::Setup(instant)));
		assert_eq!(parse("reset").unwrap(), Some(Input::Reset));
		assert_eq!(parse("").unwrap(), None);
		assert_eq!(parse(" \t").unwrap(), None);
		assert!(parse("calibrate").is_err());
	}

	#[test]
	fn settings() {
		assert_eq!(
			parse("convention NED").unwrap(),
			Some(Input::Setting(Setting::Convention(Convention::Ned)))
		);
		assert_eq!(parse("gain 0.5").unwrap(), Some(Input::Setting(Setting::Gain(0.5))));
		assert_eq!(
			parse("gyroscopeRange 2000").unwrap(),
			Some(Input::Setting(Setting::GyroscopeRange(2000.)))
		);
		assert_eq!(
			parse("recoveryTriggerPeriod 500").unwrap(),
			Some(Input::Setting(Setting::RecoveryTriggerPeriod(500)))
		);
		assert_eq!(
			parse("useMagnetometer 1").unwrap(),
			Some(Input::Setting(Setting::UseMagnetometer(true)))
		);
		assert_eq!(
			parse("useMagnetometer off").unwrap(),
			Some(Input::Setting(Setting::UseMagnetometer(false)))
		);
	}

	#[test]
	fn invalid_settings() {
		assert!(parse("gain").is_err());
		assert!(parse("gain fast").is_err());
		assert!(parse("convention xyz").is_err());
		assert!(parse("recoveryTriggerPeriod -1").is_err());
		assert!(parse("useMagnetometer maybe").is_err());
	}
}
