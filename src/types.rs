use std::ffi::OsString;
use std::path::PathBuf;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::Duration;

use strum_macros::{Display, IntoStaticStr};

use crate::traits::{Clock, Executor, Process};

#[derive(Clone, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Adb(pub(crate) PathBuf);

#[derive(Clone, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Emulator(pub(crate) PathBuf);

/// Either the project's `gradlew` wrapper or a `gradle` found in PATH
#[derive(Clone, PartialEq, Eq, Hash)]
#[repr(transparent)]
pub struct Gradle(pub(crate) PathBuf);

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Toolchain {
	pub adb: Adb,
	pub emulator: Emulator,
	pub gradle: Gradle,
}

/// One line of `adb devices -l`
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Device {
	/// AVD name for emulators, "unknown" otherwise
	pub name: String,
	pub online: String,
	pub serial: String,
	pub emulator: bool,
	pub product: String,
	pub model: String,
	pub device: String,
	pub transport_id: String,
}

/// A booted device ready for testing.
///
/// Owns the emulator process when it was launched by us. The emulator is shut down
/// exactly once, either by an explicit [`RunningDevice::kill`] or when dropped.
pub struct RunningDevice<'s> {
	pub(crate) session: &'s Session,
	pub(crate) device: Device,
	pub(crate) process: Option<Box<dyn Process>>,
	pub(crate) alive: bool,
}

/// A single external command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
	pub program: OsString,
	pub args: Vec<OsString>,
	pub cwd: Option<PathBuf>,
	pub timeout: Option<Duration>,
	pub envs: Vec<(OsString, OsString)>,
	pub ignore_errors: bool,
}

#[derive(Debug, Clone, Default)]
pub struct Interrupt(pub(crate) Arc<AtomicBool>);

/// Everything a command needs to know about its surroundings.
/// Replaces the process-wide environment mutations.
#[derive(Debug, Clone)]
pub struct Context {
	pub project_root: PathBuf,
	pub envs: Vec<(String, String)>,
	pub debug: bool,
	pub fail_on_test_failure: bool,
	pub interrupt: Interrupt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
	pub interval: Duration,
	pub timeout: Option<Duration>,
	pub max_attempts: Option<u32>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IntoStaticStr)]
pub enum BringupState {
	#[strum(serialize = "SEARCHING")]
	Searching,
	#[strum(serialize = "LAUNCHING")]
	Launching,
	#[strum(serialize = "WAITING_FOR_BOOT")]
	WaitingForBoot,
	#[strum(serialize = "READY")]
	Ready,
}

pub enum Target<'a, 's> {
	Emulator(&'a RunningDevice<'s>),
	Physical(&'a Device),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TestOutcome {
	pub code: i32,
}

#[derive(IntoStaticStr, Display)]
#[allow(non_camel_case_types)]
pub enum SettingsType {
	global,
	system,
	secure,
}

/// Entry point of every orchestration operation
pub struct Session {
	pub(crate) executor: Box<dyn Executor>,
	pub(crate) clock: Box<dyn Clock>,
	pub toolchain: Toolchain,
	pub context: Context,
}
