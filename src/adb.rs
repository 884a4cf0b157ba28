use std::ffi::OsStr;
use std::fmt::{Debug, Display, Formatter};
use std::path::{Path, PathBuf};

use which::which;

use crate::error::Error;
use crate::result::Result;
use crate::types::{Adb, Emulator, Gradle, Toolchain};
use crate::utils::sdk_tool;

impl Adb {
	pub fn new() -> Result<Adb> {
		sdk_tool("adb", &["platform-tools", "adb"])
			.map(Adb)
			.map_err(|e| Error::SdkNotFound(e.to_string()))
	}

	pub fn from(path: &Path) -> Adb {
		Adb(path.to_path_buf())
	}

	pub fn as_os_str(&self) -> &OsStr {
		self.as_ref()
	}
}

impl Emulator {
	pub fn new() -> Result<Emulator> {
		sdk_tool("emulator", &["emulator", "emulator"])
			.map(Emulator)
			.map_err(|e| Error::SdkNotFound(e.to_string()))
	}

	pub fn from(path: &Path) -> Emulator {
		Emulator(path.to_path_buf())
	}

	pub fn as_os_str(&self) -> &OsStr {
		self.as_ref()
	}
}

impl Gradle {
	/// Prefers the project's `gradlew` wrapper over a `gradle` found in PATH
	pub fn new(project_root: &Path) -> Result<Gradle> {
		let wrapper = project_root.join(if cfg!(windows) { "gradlew.bat" } else { "gradlew" });
		if wrapper.is_file() {
			return Ok(Gradle(wrapper));
		}
		Ok(Gradle(which("gradle")?))
	}

	pub fn from(path: &Path) -> Gradle {
		Gradle(path.to_path_buf())
	}

	pub fn as_os_str(&self) -> &OsStr {
		self.as_ref()
	}
}

impl Toolchain {
	/// Locates adb, emulator and gradle. Fails when the Android SDK cannot be found.
	pub fn locate(project_root: &Path) -> Result<Toolchain> {
		Ok(Toolchain {
			adb: Adb::new()?,
			emulator: Emulator::new()?,
			gradle: Gradle::new(project_root)?,
		})
	}

	pub fn from_paths<P: AsRef<Path>>(adb: P, emulator: P, gradle: P) -> Toolchain {
		Toolchain {
			adb: Adb::from(adb.as_ref()),
			emulator: Emulator::from(emulator.as_ref()),
			gradle: Gradle::from(gradle.as_ref()),
		}
	}
}

macro_rules! tool_path_impls {
	($name:ty) => {
		impl Display for $name {
			fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
				write!(f, "{}", self.0.display())
			}
		}

		impl Debug for $name {
			fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
				self.0.fmt(f)
			}
		}

		impl AsRef<OsStr> for $name {
			fn as_ref(&self) -> &OsStr {
				self.0.as_os_str()
			}
		}

		impl From<$name> for PathBuf {
			fn from(value: $name) -> Self {
				value.0
			}
		}
	};
}

tool_path_impls!(Adb);
tool_path_impls!(Emulator);
tool_path_impls!(Gradle);
