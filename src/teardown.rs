use tracing::{debug, info, warn};

use crate::config::{QUERY_TIMEOUT, TEARDOWN_POLICY};
use crate::error::Error;
use crate::prelude::InvocationExt;
use crate::traits::Process;
use crate::types::{Device, Invocation, RunningDevice, Session};

impl<'s> RunningDevice<'s> {
	pub(crate) fn new(session: &'s Session, device: Device, process: Option<Box<dyn Process>>) -> Self {
		RunningDevice {
			session,
			device,
			process,
			alive: true,
		}
	}

	pub fn device(&self) -> &Device {
		&self.device
	}

	pub fn serial(&self) -> &str {
		&self.device.serial
	}

	/// Shuts the emulator down and waits up to 60 seconds for it to leave adb.
	///
	/// Every step is best effort: failures are logged and never returned.
	/// Only the first call does anything.
	pub fn kill(&mut self) {
		if !self.alive {
			return;
		}
		self.alive = false;

		let session = self.session;
		let serial = self.device.serial.as_str();
		info!("Shutting down emulator {serial}");

		if let Some(mut process) = self.process.take() {
			debug!("killing emulator process {}", process.id());
			if let Err(err) = process.kill() {
				warn!("Failed to kill emulator process: {err}");
			}
		}

		if let Err(err) = session.capture(
			Invocation::adb(&session.toolchain.adb)
				.serial(serial)
				.args(["emu", "kill"])
				.timeout(Some(QUERY_TIMEOUT)),
		) {
			warn!("Failed to send emu kill to {serial}: {err}");
		}

		session.wait_until_gone(serial);
	}
}

impl Drop for RunningDevice<'_> {
	fn drop(&mut self) {
		self.kill();
	}
}

impl Session {
	/// true while `adb -s <serial> shell true` succeeds or hangs
	pub fn is_device_live(&self, serial: &str) -> bool {
		let result = self.capture(
			Invocation::shell(&self.toolchain.adb, serial)
				.arg("true")
				.timeout(Some(QUERY_TIMEOUT)),
		);
		match result {
			Ok(_) => true,
			Err(Error::Timeout { .. }) => {
				debug!("liveness check on {serial} timed out");
				true
			}
			Err(_) => false,
		}
	}

	/// Polls until adb no longer reaches `serial`, for at most a minute. Never fails.
	pub(crate) fn wait_until_gone(&self, serial: &str) {
		let stopped = TEARDOWN_POLICY.poll(self.clock(), |_| Ok((!self.is_device_live(serial)).then_some(())));
		match stopped {
			Ok(Some(())) => info!("Emulator {serial} is shut down"),
			_ => warn!("Timeout reached, emulator may still be running."),
		}
	}
}
