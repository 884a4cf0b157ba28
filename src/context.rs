use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use signal_hook::consts::SIGINT;

use crate::config::EMULATOR_WAIT_TIME_BEFORE_KILL;
use crate::error::Error;
use crate::result::Result;
use crate::types::{Context, Interrupt};

const FORCED_EXIT_CODE: i32 = 130;

impl Interrupt {
	pub fn new() -> Self {
		Interrupt(Arc::new(AtomicBool::new(false)))
	}

	/// Sets the flag on the first SIGINT. Long running loops are expected to call
	/// [`Interrupt::check`]. A second SIGINT while the flag is set exits at once with 130.
	pub fn install() -> std::io::Result<Self> {
		let interrupt = Interrupt::new();
		// registered first, so it sees the flag as it was before this signal
		signal_hook::flag::register_conditional_shutdown(SIGINT, FORCED_EXIT_CODE, Arc::clone(&interrupt.0))?;
		signal_hook::flag::register(SIGINT, Arc::clone(&interrupt.0))?;
		Ok(interrupt)
	}

	pub fn trigger(&self) {
		self.0.store(true, Ordering::SeqCst);
	}

	pub fn is_set(&self) -> bool {
		self.0.load(Ordering::SeqCst)
	}

	pub fn check(&self) -> Result<()> {
		if self.is_set() {
			Err(Error::Interrupted)
		} else {
			Ok(())
		}
	}
}

impl Context {
	pub fn new<P: AsRef<Path>>(project_root: P) -> Self {
		Context {
			project_root: project_root.as_ref().to_path_buf(),
			envs: vec![(EMULATOR_WAIT_TIME_BEFORE_KILL.0.to_string(), EMULATOR_WAIT_TIME_BEFORE_KILL.1.to_string())],
			debug: false,
			fail_on_test_failure: false,
			interrupt: Interrupt::new(),
		}
	}

	pub fn with_debug(mut self, debug: bool) -> Self {
		self.debug = debug;
		self
	}

	pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
		self.interrupt = interrupt;
		self
	}

	pub fn with_fail_on_test_failure(mut self, value: bool) -> Self {
		self.fail_on_test_failure = value;
		self
	}

	/// Returns a copy with `key` set, replacing any previous value
	pub fn with_env<K: Into<String>, V: Into<String>>(&self, key: K, value: V) -> Self {
		let key = key.into();
		let mut context = self.clone();
		context.envs.retain(|(k, _)| *k != key);
		context.envs.push((key, value.into()));
		context
	}

	pub fn env(&self, key: &str) -> Option<&str> {
		self.envs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
	}
}
