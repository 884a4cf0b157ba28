use std::ffi::{OsStr, OsString};
use std::fmt::{Display, Formatter};
use std::fs::File;
use std::os::unix::process::ExitStatusExt;
use std::path::Path;
use std::process::{Child, Command, ExitStatus, Stdio};
use std::thread;
use std::time::{Duration, Instant};

use itertools::Itertools;
use rustix::path::Arg;
use simple_cmd::debug::CommandDebug;
use simple_cmd::prelude::OutputExt;
use simple_cmd::Cmd;
use tracing::trace;

use crate::error::Error;
use crate::result::Result;
use crate::traits::{Executor, Process};
use crate::types::{Interrupt, Invocation};

static CHILD_POLL_INTERVAL: Duration = Duration::from_millis(50);

impl Invocation {
	pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
		Invocation {
			program: program.as_ref().to_os_string(),
			args: vec![],
			cwd: None,
			timeout: None,
			envs: vec![],
			ignore_errors: false,
		}
	}

	pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
		self.args.push(arg.as_ref().to_os_string());
		self
	}

	pub fn args<I, S>(mut self, args: I) -> Self
	where
		I: IntoIterator<Item = S>,
		S: AsRef<OsStr>,
	{
		self.args.extend(args.into_iter().map(|a| a.as_ref().to_os_string()));
		self
	}

	pub fn current_dir<P: AsRef<Path>>(mut self, dir: P) -> Self {
		self.cwd = Some(dir.as_ref().to_path_buf());
		self
	}

	pub fn timeout(mut self, timeout: Option<Duration>) -> Self {
		self.timeout = timeout;
		self
	}

	pub fn env<K: AsRef<OsStr>, V: AsRef<OsStr>>(mut self, key: K, value: V) -> Self {
		let key = key.as_ref().to_os_string();
		self.envs.retain(|(k, _)| *k != key);
		self.envs.push((key, value.as_ref().to_os_string()));
		self
	}

	pub fn ignore_errors(mut self, ignore_errors: bool) -> Self {
		self.ignore_errors = ignore_errors;
		self
	}

	pub(crate) fn to_command(&self) -> Command {
		let mut command = Command::new(&self.program);
		command.args(&self.args);
		command.envs(self.envs.iter().map(|(k, v)| (k, v)));
		if let Some(cwd) = &self.cwd {
			command.current_dir(cwd);
		}
		command
	}
}

impl Display for Invocation {
	fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
		let line = std::iter::once(&self.program)
			.chain(self.args.iter())
			.map(quote)
			.join(" ");
		write!(f, "{line}")
	}
}

fn quote(arg: &OsString) -> String {
	let s = arg.to_string_lossy();
	if s.is_empty() || s.contains(char::is_whitespace) {
		format!("\"{s}\"")
	} else {
		s.into_owned()
	}
}

#[derive(Debug, Clone, Default)]
pub struct SystemExecutor {
	pub(crate) debug: bool,
	pub(crate) interrupt: Interrupt,
}

impl SystemExecutor {
	pub fn new(debug: bool, interrupt: Interrupt) -> Self {
		SystemExecutor { debug, interrupt }
	}

	fn spawn_command(&self, command: &mut Command) -> std::io::Result<Child> {
		if self.debug {
			command.debug().spawn()
		} else {
			command.spawn()
		}
	}
}

impl Executor for SystemExecutor {
	fn run(&self, invocation: &Invocation) -> Result<i32> {
		let mut command = invocation.to_command();
		let mut child = self.spawn_command(&mut command)?;
		let deadline = invocation.timeout.map(|t| Instant::now() + t);

		loop {
			if let Some(status) = child.try_wait()? {
				return Ok(exit_code(status));
			}

			if self.interrupt.is_set() {
				trace!("interrupted, killing `{invocation}`");
				terminate(&mut child);
				return Err(Error::Interrupted);
			}

			if deadline.is_some_and(|d| Instant::now() >= d) {
				trace!("timeout expired, killing `{invocation}`");
				terminate(&mut child);
				return Err(Error::Timeout {
					command: invocation.to_string(),
					timeout: invocation.timeout.unwrap_or_default(),
				});
			}

			thread::sleep(CHILD_POLL_INTERVAL);
		}
	}

	fn capture(&self, invocation: &Invocation) -> Result<String> {
		let output = Cmd::builder(&invocation.program)
			.args(&invocation.args)
			.with_debug(self.debug)
			.timeout(invocation.timeout)
			.build()
			.output()?;

		// simple_cmd kills the child on timeout and still hands back its output
		if invocation.timeout.is_some() && output.kill() {
			return Err(Error::Timeout {
				command: invocation.to_string(),
				timeout: invocation.timeout.unwrap_or_default(),
			});
		}

		if !output.success() {
			return Err(Error::CommandFailed {
				command: invocation.to_string(),
				code: output.status.code().unwrap_or(1),
			});
		}
		Ok(Arg::as_str(&output.stdout)?.trim().to_string())
	}

	fn spawn(&self, invocation: &Invocation, log: Option<&Path>) -> Result<Box<dyn Process>> {
		let mut command = invocation.to_command();
		command.stdin(Stdio::null());
		match log {
			Some(path) => {
				let file = File::create(path)?;
				command.stdout(Stdio::from(file.try_clone()?)).stderr(Stdio::from(file));
			}
			None => {
				command.stdout(Stdio::null()).stderr(Stdio::null());
			}
		}

		let child = self.spawn_command(&mut command)?;
		Ok(Box::new(ChildProcess(child)))
	}
}

#[derive(Debug)]
pub struct ChildProcess(Child);

impl Process for ChildProcess {
	fn id(&self) -> u32 {
		self.0.id()
	}

	fn kill(&mut self) -> Result<()> {
		if self.0.try_wait()?.is_none() {
			self.0.kill()?;
			self.0.wait()?;
		}
		Ok(())
	}
}

fn terminate(child: &mut Child) {
	let _ = child.kill();
	let _ = child.wait();
}

fn exit_code(status: ExitStatus) -> i32 {
	status
		.code()
		.unwrap_or_else(|| status.signal().map(|s| 128 + s).unwrap_or(1))
}
