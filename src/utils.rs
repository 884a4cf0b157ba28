use std::path::{Path, PathBuf};

use anyhow::anyhow;
use which::which;

/// Attempt to find the Android SDK root.
/// ANDROID_HOME and ANDROID_SDK_ROOT are checked first, then the default install location,
/// then the parent of the `platform-tools` directory holding the adb found in PATH.
pub fn android_home() -> anyhow::Result<PathBuf> {
	for var in ["ANDROID_HOME", "ANDROID_SDK_ROOT"] {
		if let Ok(path) = std::env::var(var) {
			let pathbuf = PathBuf::from(path);
			if pathbuf.exists() {
				return Ok(pathbuf);
			}
		}
	}

	if let Some(pathbuf) = default_sdk_dir().filter(|p| p.exists()) {
		return Ok(pathbuf);
	}

	match which("adb") {
		Ok(adb) => adb
			.parent()
			.and_then(Path::parent)
			.map(Path::to_path_buf)
			.filter(|p| p.exists())
			.ok_or(anyhow!("ANDROID_HOME not set or invalid")),
		Err(err) => Err(anyhow::Error::from(err)),
	}
}

/// Attempt to find a tool by name in PATH, falling back to `<sdk>/<relative>`
pub fn sdk_tool(name: &str, relative: &[&str]) -> anyhow::Result<PathBuf> {
	if let Ok(path) = which(name) {
		return Ok(path);
	}
	let path = relative.iter().fold(android_home()?, |acc, part| acc.join(part));
	if path.exists() {
		Ok(path)
	} else {
		Err(anyhow::Error::msg(format!("{name} not found")))
	}
}

fn default_sdk_dir() -> Option<PathBuf> {
	let home = dirs::home_dir()?;
	if cfg!(target_os = "macos") {
		Some(home.join("Library").join("Android").join("sdk"))
	} else {
		Some(home.join("Android").join("Sdk"))
	}
}
