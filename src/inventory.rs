use lazy_static::lazy_static;
use regex::Regex;
use tracing::{debug, warn};

use crate::config::{QUERY_TIMEOUT, SEARCH_POLICY};
use crate::prelude::InvocationExt;
use crate::result::Result;
use crate::types::{Device, Invocation, Session};

pub const UNKNOWN_NAME: &str = "unknown";

lazy_static! {
	static ref RE_EMULATOR_SERIAL: Regex = Regex::new(r"^emulator-\d+$").unwrap();
	static ref RE_EMULATOR_DIAGNOSTIC: Regex = Regex::new(r"^(INFO|WARNING|ERROR|FATAL)\s*\|").unwrap();
}

impl Session {
	/// List the devices currently known to adb, in `adb devices -l` order
	pub fn list_live_devices(&self) -> Result<Vec<Device>> {
		let output = self.capture(
			Invocation::adb(&self.toolchain.adb)
				.args(["devices", "-l"])
				.timeout(Some(QUERY_TIMEOUT)),
		)?;

		let devices = parse_devices(&output)
			.into_iter()
			.map(|mut device| {
				if device.emulator {
					device.name = self.emulator_name(&device.serial);
				}
				debug!("Device info: {device}");
				device
			})
			.collect();
		Ok(devices)
	}

	/// Emulator AVD names, optionally restricted to the ones mentioning `api`
	pub fn list_available_images(&self, api: Option<u8>) -> Result<Vec<String>> {
		let output = self.capture(
			Invocation::new(&self.toolchain.emulator)
				.arg("-list-avds")
				.timeout(Some(QUERY_TIMEOUT)),
		)?;
		Ok(parse_avds(&output, api))
	}

	/// Polls the inventory until an emulator shows up or the attempt budget is spent
	pub fn first_live_emulator(&self) -> Result<Option<Device>> {
		SEARCH_POLICY.poll(self.clock(), |_| {
			self.context.interrupt.check()?;
			Ok(self.list_live_devices()?.into_iter().find(|device| device.emulator))
		})
	}

	/// Installed packages, with the `package:` prefix removed.
	/// Failures are logged and reported as an empty list.
	pub fn list_packages(&self, device: &Device, filter: Option<&str>) -> Vec<String> {
		let result = self.capture(
			Invocation::shell(&self.toolchain.adb, &device.serial)
				.args(["pm", "list", "packages"])
				.timeout(Some(QUERY_TIMEOUT)),
		);
		match result {
			Ok(output) => parse_packages(&output, filter),
			Err(err) => {
				warn!("Error listing packages on {}: {err}", device.serial);
				vec![]
			}
		}
	}

	/// AVD name of a running emulator, "unknown" when it cannot be resolved
	pub(crate) fn emulator_name(&self, serial: &str) -> String {
		let getprop = self.capture(
			Invocation::shell(&self.toolchain.adb, serial)
				.args(["getprop", "ro.boot.qemu.avd_name"])
				.timeout(Some(QUERY_TIMEOUT)),
		);
		match getprop {
			Ok(name) if !name.is_empty() => return name,
			Ok(_) => {}
			Err(err) => debug!("getprop ro.boot.qemu.avd_name failed on {serial}: {err}"),
		}

		// older system images only answer on the emulator console
		self.capture(
			Invocation::adb(&self.toolchain.adb)
				.serial(serial)
				.args(["emu", "avd", "name"])
				.timeout(Some(QUERY_TIMEOUT)),
		)
		.ok()
		.and_then(|output| {
			output
				.lines()
				.map(str::trim)
				.find(|line| !line.is_empty() && *line != "OK")
				.map(str::to_string)
		})
		.unwrap_or_else(|| UNKNOWN_NAME.to_string())
	}
}

pub fn filter_physical(devices: Vec<Device>) -> Vec<Device> {
	devices.into_iter().filter(|device| !device.emulator).collect()
}

pub fn is_emulator_serial(serial: &str) -> bool {
	RE_EMULATOR_SERIAL.is_match(serial)
}

/// Parses `adb devices -l`. The header, adb daemon notices and blank lines are dropped.
pub fn parse_devices(output: &str) -> Vec<Device> {
	output
		.lines()
		.skip(1)
		.map(str::trim)
		.filter(|line| !line.is_empty())
		.filter(|line| !line.contains("List of devices attached"))
		.filter(|line| !line.starts_with('*'))
		.map(parse_device_line)
		.collect()
}

/// `<serial> <state> [usb:<path>] product:<p> model:<m> device:<d> transport_id:<t>`
///
/// Fields are positional; missing trailing fields are empty.
pub fn parse_device_line(line: &str) -> Device {
	let mut parts: Vec<&str> = line.split_whitespace().collect();
	if parts.len() > 2 && parts[2].starts_with("usb:") {
		parts.remove(2);
	}
	if parts.len() < 6 {
		parts.resize(6, "");
	}

	let serial = parts[0];
	Device {
		name: UNKNOWN_NAME.to_string(),
		online: parts[1].to_string(),
		serial: serial.to_string(),
		emulator: is_emulator_serial(serial),
		product: field_value(parts[2]).to_string(),
		model: field_value(parts[3]).to_string(),
		device: field_value(parts[4]).to_string(),
		transport_id: field_value(parts[5]).to_string(),
	}
}

/// `key:value` yields `value`, a bare token is returned as is
pub fn field_value(part: &str) -> &str {
	part.split(':').nth(1).unwrap_or(part)
}

pub(crate) fn parse_avds(output: &str, api: Option<u8>) -> Vec<String> {
	let api = api.map(|a| a.to_string());
	output
		.lines()
		.map(str::trim)
		.filter(|line| !line.is_empty())
		.filter(|line| !RE_EMULATOR_DIAGNOSTIC.is_match(line))
		.filter(|line| api.as_ref().map_or(true, |api| line.contains(api.as_str())))
		.map(str::to_string)
		.collect()
}

pub(crate) fn parse_packages(output: &str, filter: Option<&str>) -> Vec<String> {
	output
		.lines()
		.map(str::trim)
		.filter(|line| !line.is_empty())
		.map(|line| line.strip_prefix("package:").unwrap_or(line))
		.filter(|package| filter.map_or(true, |f| package.contains(f)))
		.map(str::to_string)
		.collect()
}
