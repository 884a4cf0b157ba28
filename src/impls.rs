use std::fmt::{Debug, Display, Formatter};

use crate::types::{Device, RunningDevice, Target, TestOutcome};

impl Display for Device {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		write!(
			f,
			"{} ({}, {}, model:{}, transport_id:{})",
			self.serial, self.name, self.online, self.model, self.transport_id
		)
	}
}

impl Debug for RunningDevice<'_> {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("RunningDevice")
			.field("device", &self.device)
			.field("process", &self.process)
			.field("alive", &self.alive)
			.finish()
	}
}

impl Display for Target<'_, '_> {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		match self {
			Target::Emulator(running) => write!(f, "Running on \"{}\"", running.serial()),
			Target::Physical(device) => write!(f, "Running on physical device \"{}\"", device.model),
		}
	}
}

impl Display for TestOutcome {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		if self.code == 0 {
			write!(f, "passed")
		} else {
			write!(f, "failed (exit code {})", self.code)
		}
	}
}
