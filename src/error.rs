use std::time::Duration;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum Error {
	#[error(transparent)]
	WhichError(#[from] which::Error),

	#[error(transparent)]
	CommandError(#[from] simple_cmd::Error),

	#[error(transparent)]
	IoError(#[from] std::io::Error),

	#[error(transparent)]
	PromptError(#[from] dialoguer::Error),

	#[error("command `{command}` exited with code {code}")]
	CommandFailed { command: String, code: i32 },

	#[error("command `{command}` timed out after {timeout:?}")]
	Timeout { command: String, timeout: Duration },

	#[error("no emulator image available (api filter: {0:?})")]
	NoEmulatorImage(Option<u8>),

	#[error("no emulator device came online")]
	NoEmulatorDevice,

	#[error("no device found, please launch one then try again")]
	NoDevice,

	#[error("invalid device selection: {0}")]
	InvalidDevice(String),

	#[error("Android SDK not found: {0}")]
	SdkNotFound(String),

	#[error("interrupted")]
	Interrupted,
}

impl Error {
	/// The process exit code this error maps to.
	pub fn exit_code(&self) -> i32 {
		match self {
			Error::CommandFailed { code, .. } => *code,
			Error::Interrupted => 0,
			_ => 1,
		}
	}
}

impl From<rustix::io::Errno> for Error {
	fn from(value: rustix::io::Errno) -> Self {
		Error::IoError(std::io::Error::from(value))
	}
}
