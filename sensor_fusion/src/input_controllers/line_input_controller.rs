use std::{io::BufRead, time::Instant};

use crate::input::{parse_line, Input};
use crate::traits::InputController;

/// Reads one host message per line. Malformed lines are logged and skipped.
pub struct LineInputController<R> {
	reader: R,
	line: String,
}

impl<R: BufRead> LineInputController<R> {
	pub fn new(reader: R) -> Self {
		LineInputController {
			reader,
			line: String::new(),
		}
	}
}

impl<R: BufRead + Send + 'static> InputController for LineInputController<R> {
	fn read_input(&mut self) -> anyhow::Result<Option<Input>> {
		loop {
			self.line.clear();

			if self.reader.read_line(&mut self.line)? == 0 {
				return Ok(None);
			}

			match parse_line(&self.line, Instant::now()) {
				Ok(Some(input)) => return Ok(Some(input)),
				Ok(None) => {}
				Err(e) => debug!("Ignoring \"{}\": {}", self.line.trim_end(), e),
			}
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crossbeam_channel::unbounded;
	use nalgebra::Vector3;
	use std::io::Cursor;

	#[test]
	fn reads_until_end_of_input() {
		let reader = Cursor::new("setup\naccel 0 0 1\n\ngyro 1 2\nbogus 3\nreset\n");
		let (sender, receiver) = unbounded::<Input>();

		LineInputController::new(reader).spawn(sender).join().unwrap();

		let inputs: Vec<Input> = receiver.iter().collect();
		assert_eq!(inputs.len(), 3);
		assert!(matches!(inputs[0], Input::Setup(_)));
		assert_eq!(inputs[1], Input::Accelerometer(Vector3::z()));
		assert_eq!(inputs[2], Input::Reset);
	}
}
