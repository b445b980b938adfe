use crate::input::Input;
use crossbeam_channel::{bounded, select, tick, Receiver, Sender};
use std::{thread, time::Duration};

/// Controllers that import external data.
pub trait InputController
where
	Self: Sized + Send + 'static,
{
	/// Blocks until the next input. `Ok(None)` once the source is exhausted.
	fn read_input(&mut self) -> anyhow::Result<Option<Input>>;

	/// Forwards inputs until the source is exhausted, fails, or nobody listens anymore.
	fn read_loop(&mut self, input_sender: Sender<Input>) {
		loop {
			match self.read_input() {
				Ok(Some(input)) => {
					if input_sender.send(input).is_err() {
						break;
					}
				}
				Ok(None) => break,
				Err(e) => {
					error!("{}", e);
					break;
				}
			}
		}

		debug!("Input closed");
	}

	/// Spawns a thread running `read_loop`. Dropping its sender closes the input channel.
	fn spawn(mut self, input_sender: Sender<Input>) -> thread::JoinHandle<()> {
		thread::spawn(move || self.read_loop(input_sender))
	}
}

/// Periodic producers of internal data.
pub trait Monitor<T: Send + 'static>
where
	Self: Sized + Send + 'static,
{
	/// Period between two successive `monitor` calls.
	const PERIOD: Duration;

	fn monitor(&mut self) -> T;

	fn monitor_loop(&mut self, sender: Sender<T>, stop_receiver: Receiver<()>) {
		let ticker = tick(Self::PERIOD);

		loop {
			select! {
				recv(ticker) -> _ => {
					if sender.send(self.monitor()).is_err() {
						break;
					}
				}
				// Stop request, or handle dropped
				recv(stop_receiver) -> _ => break,
			}
		}
	}

	fn spawn(mut self, sender: Sender<T>) -> MonitorHandle {
		let (stop_sender, stop_receiver) = bounded::<()>(1);

		MonitorHandle {
			stop_sender,
			join_handle: thread::spawn(move || self.monitor_loop(sender, stop_receiver)),
		}
	}
}

pub struct MonitorHandle {
	stop_sender: Sender<()>,
	join_handle: thread::JoinHandle<()>,
}

impl MonitorHandle {
	/// Stops the monitor and waits for its thread. No output is produced afterwards.
	pub fn stop(self) {
		let _ = self.stop_sender.send(());

		if self.join_handle.join().is_err() {
			error!("Monitor thread panicked");
		}
	}
}

/// Controllers that export data to external devices.
pub trait OutputController<T: Send + 'static>
where
	Self: Sized + Send + 'static,
{
	fn write_output(&mut self, output: T) -> anyhow::Result<()>;

	/// Runs until every sender is dropped.
	fn write_loop(&mut self, output_receiver: Receiver<T>) {
		for output in output_receiver.iter() {
			self.write_output(output)
				.map_err(|e| error!("{}", e))
				.unwrap_or_default();
		}
	}

	fn spawn(mut self, output_receiver: Receiver<T>) -> thread::JoinHandle<()> {
		thread::spawn(move || self.write_loop(output_receiver))
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use crossbeam_channel::unbounded;

	struct Counter(u32);

	impl Monitor<u32> for Counter {
		const PERIOD: Duration = Duration::from_millis(2);

		fn monitor(&mut self) -> u32 {
			self.0 += 1;
			self.0
		}
	}

	#[test]
	fn monitor_runs_until_stopped() {
		let (sender, receiver) = unbounded::<u32>();
		let handle = Counter(0).spawn(sender);

		let first: Vec<u32> = receiver.iter().take(3).collect();
		assert_eq!(first, vec![1, 2, 3]);

		handle.stop();

		// The monitor thread owned the only sender
		let remaining: Vec<u32> = receiver.iter().collect();
		assert!(remaining.iter().all(|&count| count > 3));
	}

	#[test]
	fn monitor_stops_when_output_is_closed() {
		let (sender, receiver) = unbounded::<u32>();
		let handle = Counter(0).spawn(sender);

		drop(receiver);
		handle.stop();
	}
}
