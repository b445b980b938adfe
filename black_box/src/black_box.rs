use crossbeam_channel::{bounded, unbounded, Receiver, Sender};
use log::{Level, LevelFilter, Log, Metadata, Record, SetLoggerError};
use std::{
	collections::VecDeque,
	fs::{File, OpenOptions},
	io,
	io::Write,
	path::Path,
	thread,
	thread::JoinHandle,
	time::{Duration, Instant},
};

lazy_static! {
	static ref BLACK_BOX_CHANNEL: (Sender<Message>, Receiver<Message>) = unbounded::<Message>();
	static ref BLACK_BOX_LOGGER: BlackBoxLogger = BlackBoxLogger {
		start_instant: Instant::now()
	};
}

enum Message {
	Log(String),
	/// Acknowledged once everything received before it is written.
	Flush(Sender<()>),
}

/// Asynchronous logger writing to stderr and, optionally, to a timestamped log file.
///
/// Stdout is left alone: it carries the fused data.
pub struct BlackBox {
	file: Option<File>,
	buffer: VecDeque<String>,
}

impl BlackBox {
	/// Log lines are also written to a new file in `directory`, if given.
	pub fn new(directory: Option<&Path>) -> io::Result<Self> {
		let file = match directory {
			Some(directory) => {
				let log_file_name = chrono::offset::Local::now()
					.format("sensor_fusion_%Y-%m-%d_%H-%M-%S.log")
					.to_string();

				Some(OpenOptions::new()
					.write(true)
					.create(true)
					.truncate(true)
					.open(directory.join(log_file_name))?)
			}
			None => None,
		};

		Ok(BlackBox {
			file,
			buffer: VecDeque::<String>::new(),
		})
	}

	fn try_flush(&mut self) {
		if let Err(e) = self.flush() {
			// The file is unusable, keep logging to stderr only
			self.file = None;
			self.buffer.push_back(format!("Failed to flush black box: {}", e));
		}
	}

	fn flush(&mut self) -> io::Result<()> {
		let stderr = io::stderr();
		let mut stderr = stderr.lock();

		while let Some(message) = self.buffer.pop_front() {
			writeln!(stderr, "{}", message)?;
			if let Some(file) = self.file.as_mut() {
				writeln!(file, "{}", message)?;
			}
		}

		if let Some(file) = self.file.as_mut() {
			file.flush()?;
		}
		Ok(())
	}

	fn receive_loop(&mut self) {
		const RECEIVE_TIMEOUT: Duration = Duration::from_millis(500);
		const MAX_BUFFER_LEN: usize = 8;

		// The sending end lives in a static, the channel never disconnects
		loop {
			match BLACK_BOX_CHANNEL.1.recv_timeout(RECEIVE_TIMEOUT) {
				Ok(Message::Log(content)) => {
					self.buffer.push_back(content);
					if self.buffer.len() > MAX_BUFFER_LEN {
						self.try_flush();
					}
				}
				Ok(Message::Flush(acknowledge)) => {
					self.try_flush();
					let _ = acknowledge.send(());
				}
				Err(_) => self.try_flush(),
			}
		}
	}

	/// Installs the global logger. Fails if another logger was installed first.
	pub fn spawn(mut self, level_filter: LevelFilter) -> Result<JoinHandle<()>, SetLoggerError> {
		log::set_logger(&*BLACK_BOX_LOGGER)?;
		log::set_max_level(level_filter);

		Ok(thread::spawn(move || self.receive_loop()))
	}
}

pub fn parse_level_filter(level_filter: &str) -> Option<LevelFilter> {
	Some(match level_filter {
		"none" => LevelFilter::Off,
		"error" => LevelFilter::Error,
		"warn" => LevelFilter::Warn,
		"info" => LevelFilter::Info,
		"debug" => LevelFilter::Debug,
		"all" | "trace" => LevelFilter::Trace,
		_ => return None,
	})
}

struct BlackBoxLogger {
	start_instant: Instant,
}

impl BlackBoxLogger {
	fn format(&self, record: &Record) -> String {
		let elapsed = (Instant::now() - self.start_instant).as_secs_f32();

		if record.level() == Level::Error {
			format!(
				"[{:.3}][{:?}][{}] {} ({}:{})",
				elapsed,
				record.level(),
				record.module_path().unwrap_or("unknown"),
				record.args(),
				record.file().unwrap_or("unknown"),
				record.line().unwrap_or(0)
			)
		} else {
			format!(
				"[{:.3}][{:?}][{}] {}",
				elapsed,
				record.level(),
				record.module_path().unwrap_or("unknown"),
				record.args(),
			)
		}
	}
}

impl Log for BlackBoxLogger {
	fn enabled(&self, metadata: &Metadata) -> bool {
		metadata.level() <= log::max_level()
	}

	fn log(&self, record: &Record) {
		if self.enabled(record.metadata()) {
			// The receiving end lives in the same static, sending cannot fail
			let _ = BLACK_BOX_CHANNEL.0.send(Message::Log(self.format(record)));
		}
	}

	/// Blocks until the writer thread has written every pending line, or for at most a second.
	fn flush(&self) {
		const FLUSH_TIMEOUT: Duration = Duration::from_secs(1);

		let (acknowledge_sender, acknowledge_receiver) = bounded::<()>(1);

		if BLACK_BOX_CHANNEL.0.send(Message::Flush(acknowledge_sender)).is_ok() {
			let _ = acknowledge_receiver.recv_timeout(FLUSH_TIMEOUT);
		}
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn level_filters() {
		assert_eq!(parse_level_filter("none"), Some(LevelFilter::Off));
		assert_eq!(parse_level_filter("warn"), Some(LevelFilter::Warn));
		assert_eq!(parse_level_filter("all"), Some(LevelFilter::Trace));
		assert_eq!(parse_level_filter("trace"), Some(LevelFilter::Trace));
		assert_eq!(parse_level_filter("verbose"), None);
	}

	#[test]
	fn record_format() {
		let logger = BlackBoxLogger { start_instant: Instant::now() };

		let formatted = logger.format(&Record::builder()
			.args(format_args!("sample dropped"))
			.level(Level::Debug)
			.module_path(Some("sensor_fusion::fusion"))
			.build());
		assert!(formatted.ends_with("[Debug][sensor_fusion::fusion] sample dropped"), "{}", formatted);

		let formatted = logger.format(&Record::builder()
			.args(format_args!("failed"))
			.level(Level::Error)
			.module_path(Some("sensor_fusion"))
			.file(Some("main.rs"))
			.line(Some(12))
			.build());
		assert!(formatted.ends_with("[Error][sensor_fusion] failed (main.rs:12)"), "{}", formatted);
	}

	#[test]
	fn flush_waits_for_pending_lines() {
		let directory = std::env::temp_dir().join(format!("black_box_flush_{}", std::process::id()));
		std::fs::create_dir_all(&directory).unwrap();

		BlackBox::new(Some(&directory)).unwrap().spawn(LevelFilter::Info).unwrap();

		log::info!("first line");
		log::debug!("filtered out");
		log::logger().flush();

		let entries: Vec<_> = std::fs::read_dir(&directory).unwrap().collect();
		assert_eq!(entries.len(), 1);

		let content = std::fs::read_to_string(entries[0].as_ref().unwrap().path()).unwrap();
		assert!(content.contains("first line"), "{}", content);
		assert!(!content.contains("filtered out"), "{}", content);

		std::fs::remove_dir_all(&directory).unwrap();
	}

	#[test]
	fn log_file_is_created_in_directory() {
		let directory = std::env::temp_dir().join(format!("black_box_test_{}", std::process::id()));
		std::fs::create_dir_all(&directory).unwrap();

		let mut black_box = BlackBox::new(Some(&directory)).unwrap();
		black_box.buffer.push_back("hello".to_string());
		black_box.flush().unwrap();

		let entries: Vec<_> = std::fs::read_dir(&directory).unwrap().collect();
		assert_eq!(entries.len(), 1);

		let path = entries[0].as_ref().unwrap().path();
		assert_eq!(std::fs::read_to_string(&path).unwrap(), "hello\n");

		std::fs::remove_dir_all(&directory).unwrap();
	}
}
