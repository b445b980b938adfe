use serde::Serialize;
use std::io::Write;

use crate::traits::OutputController;

/// Writes each output as one JSON line, flushed immediately.
pub struct JsonOutputController<W> {
	writer: W,
}

impl<W: Write> JsonOutputController<W> {
	pub fn new(writer: W) -> Self {
		JsonOutputController { writer }
	}

	pub fn into_inner(self) -> W {
		self.writer
	}
}

impl<T, W> OutputController<T> for JsonOutputController<W>
where
	T: Serialize + Send + 'static,
	W: Write + Send + 'static,
{
	fn write_output(&mut self, output: T) -> anyhow::Result<()> {
		serde_json::to_writer(&mut self.writer, &output)?;
		self.writer.write_all(b"\n")?;
		self.writer.flush()?;

		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crate::output::{Diagnostics, Output};

	#[test]
	fn one_object_per_line() {
		let mut controller = JsonOutputController::new(Vec::<u8>::new());

		let diagnostics = Output::Diagnostics(Diagnostics {
			flags: Default::default(),
			states: Default::default(),
		});

		controller.write_output(diagnostics.clone()).unwrap();
		controller.write_output(diagnostics).unwrap();

		let written = String::from_utf8(controller.into_inner()).unwrap();
		let lines: Vec<&str> = written.lines().collect();
		assert_eq!(lines.len(), 2);

		let json: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
		assert_eq!(json["diagnostics"]["flags"]["initialising"], false);
	}
}
