use std::fmt::Debug;
use std::path::Path;
use std::time::{Duration, Instant};

use crate::result::Result;
use crate::types::Invocation;

/// Runs external commands on behalf of a [`crate::types::Session`]
pub trait Executor {
	/// Runs to completion with inherited stdio, returning the exit code.
	/// Honors the invocation's working directory, environment and timeout.
	fn run(&self, invocation: &Invocation) -> Result<i32>;

	/// Runs a query command and returns its stdout. A non-zero exit is an error.
	/// Working directory and environment overrides are not applied.
	fn capture(&self, invocation: &Invocation) -> Result<String>;

	/// Starts a long-lived process, writing its combined output to `log` when given.
	fn spawn(&self, invocation: &Invocation, log: Option<&Path>) -> Result<Box<dyn Process>>;
}

pub trait Process: Debug {
	fn id(&self) -> u32;
	fn kill(&mut self) -> Result<()>;
}

pub trait Clock {
	fn now(&self) -> Instant;
	fn sleep(&self, duration: Duration);
}
