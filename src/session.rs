use std::ffi::OsStr;
use std::path::Path;
use std::time::Duration;

use tracing::{debug, error, info, warn};

use crate::clock::SystemClock;
use crate::command::SystemExecutor;
use crate::error::Error;
use crate::result::Result;
use crate::traits::{Clock, Executor, Process};
use crate::types::{Context, Invocation, Session, Toolchain};

impl Session {
	pub fn new(executor: Box<dyn Executor>, clock: Box<dyn Clock>, toolchain: Toolchain, context: Context) -> Self {
		Session {
			executor,
			clock,
			toolchain,
			context,
		}
	}

	/// Session running real commands. Fails when adb, emulator or gradle cannot be found.
	pub fn system(context: Context) -> Result<Session> {
		let toolchain = Toolchain::locate(&context.project_root)?;
		let executor = SystemExecutor::new(context.debug, context.interrupt.clone());
		Ok(Session::new(Box::new(executor), Box::new(SystemClock), toolchain, context))
	}

	/// Runs a command to completion with inherited stdio.
	///
	/// The working directory defaults to the project root and the context environment
	/// is applied underneath the invocation's own variables. Unless `ignore_errors` is
	/// set, a non-zero exit code is returned as [`Error::CommandFailed`] so the caller
	/// stops right there.
	pub fn exec(&self, invocation: Invocation) -> Result<i32> {
		let cwd = invocation
			.cwd
			.clone()
			.unwrap_or_else(|| self.context.project_root.clone());
		let invocation = self.apply_context(invocation).current_dir(&cwd);

		info!("Executing:\n  {invocation}\n  with cwd={}", cwd.display());
		let code = self.executor.run(&invocation)?;
		if code != 0 && !invocation.ignore_errors {
			error!("Error executing command: {invocation}");
			return Err(Error::CommandFailed {
				command: invocation.to_string(),
				code,
			});
		}
		Ok(code)
	}

	/// Like [`Session::exec`], but failures are only logged. An interrupt still stops the caller.
	pub(crate) fn exec_best_effort(&self, invocation: Invocation) -> Result<()> {
		let line = invocation.to_string();
		match self.exec(invocation.ignore_errors(true)) {
			Ok(0) => Ok(()),
			Ok(code) => {
				warn!("`{line}` exited with code {code}");
				Ok(())
			}
			Err(Error::Interrupted) => Err(Error::Interrupted),
			Err(err) => {
				warn!("`{line}` failed: {err}");
				Ok(())
			}
		}
	}

	pub(crate) fn capture(&self, invocation: Invocation) -> Result<String> {
		debug!("Running: {invocation}");
		self.executor.capture(&invocation)
	}

	pub(crate) fn spawn(&self, invocation: Invocation, log: Option<&Path>) -> Result<Box<dyn Process>> {
		let invocation = self.apply_context(invocation);
		info!("Launching: {invocation}");
		self.executor.spawn(&invocation, log)
	}

	pub(crate) fn sleep(&self, duration: Duration) {
		self.clock.sleep(duration)
	}

	pub(crate) fn clock(&self) -> &dyn Clock {
		self.clock.as_ref()
	}

	fn apply_context(&self, invocation: Invocation) -> Invocation {
		self.context.envs.iter().fold(invocation, |invocation, (key, value)| {
			if invocation.envs.iter().any(|(k, _)| k.as_os_str() == OsStr::new(key)) {
				invocation
			} else {
				invocation.env(key, value)
			}
		})
	}
}
