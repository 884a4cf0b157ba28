use std::io::IsTerminal;

use dialoguer::theme::ColorfulTheme;
use dialoguer::Select;
use tracing::{info, warn};

use crate::config::{APP_PACKAGE_NAME, COMMAND_TIMEOUT, QUERY_TIMEOUT, RELEASE_APK, WATCH_INTERVAL};
use crate::error::Error;
use crate::prelude::InvocationExt;
use crate::result::Result;
use crate::types::{Device, Invocation, Session};

impl Session {
	/// Replaces the installed app with the release build and checks it is there
	pub fn install_release(&self, device: &Device) -> Result<()> {
		let apk = self.context.project_root.join(RELEASE_APK);
		self.exec_best_effort(self.adb_on(device).args(["uninstall", APP_PACKAGE_NAME]))?;
		self.exec(self.adb_on(device).args(["install", "-r"]).arg(&apk))?;
		self.exec(Invocation::shell(&self.toolchain.adb, &device.serial).args(["pm", "list", "packages", APP_PACKAGE_NAME]))?;
		Ok(())
	}

	pub fn start_app(&self, device: &Device) -> Result<()> {
		self.exec_best_effort(
			Invocation::shell(&self.toolchain.adb, &device.serial).args(["am", "force-stop", APP_PACKAGE_NAME]),
		)?;
		self.exec(Invocation::shell(&self.toolchain.adb, &device.serial).args(["monkey", "-p", APP_PACKAGE_NAME, "1"]))?;
		Ok(())
	}

	pub fn uninstall_app(&self, device: &Device) -> Result<()> {
		self.exec(
			self.adb_on(device)
				.args(["uninstall", APP_PACKAGE_NAME])
				.timeout(Some(COMMAND_TIMEOUT)),
		)?;
		Ok(())
	}

	/// Sends `emu kill` to every running emulator, then waits for each of them to leave adb.
	/// Failures are only logged.
	pub fn shutdown_all_running_emulators(&self) -> Result<()> {
		let mut stopping = vec![];
		for device in self.list_live_devices()?.into_iter().filter(|d| d.emulator) {
			info!("Shutting down emulator: {}", device.name);
			match self.capture(
				self.adb_on(&device)
					.args(["emu", "kill"])
					.timeout(Some(QUERY_TIMEOUT)),
			) {
				Ok(_) => stopping.push(device.serial),
				Err(err) => warn!("Error shutting down emulator: {err}"),
			}
		}

		for serial in &stopping {
			self.wait_until_gone(serial);
		}
		Ok(())
	}

	/// Model names of the devices in the `device` state
	pub fn device_models(&self) -> Result<Vec<String>> {
		let devices = self.list_live_devices()?;
		Ok(devices
			.iter()
			.filter(|d| d.online == "device")
			.map(|d| {
				self.capture(
					Invocation::shell(&self.toolchain.adb, &d.serial)
						.args(["getprop", "ro.product.model"])
						.timeout(Some(QUERY_TIMEOUT)),
				)
				.unwrap_or_else(|_| d.serial.clone())
			})
			.collect())
	}

	/// Prints the connected devices. With `watch` the list is redrawn every second
	/// until interrupted.
	pub fn show_devices(&self, watch: bool) -> Result<()> {
		loop {
			self.context.interrupt.check()?;
			let report = format_device_report(&self.device_models()?);
			if watch {
				// clear screen, cursor home
				print!("\x1B[2J\x1B[1;1H");
			}
			println!("{report}");

			if !watch {
				return Ok(());
			}
			self.sleep(WATCH_INTERVAL);
		}
	}

	fn adb_on(&self, device: &Device) -> Invocation {
		Invocation::adb(&self.toolchain.adb).serial(&device.serial)
	}
}

/// Picks the device to work on.
///
/// An explicit serial must match one of `devices`. Without one, a single device is used
/// as is and several devices are offered in an interactive prompt.
pub fn select_device(devices: Vec<Device>, serial: Option<&str>) -> Result<Device> {
	let interactive = std::io::stdin().is_terminal() && std::io::stdout().is_terminal();
	choose_device(devices, serial, interactive)
}

fn choose_device(devices: Vec<Device>, serial: Option<&str>, interactive: bool) -> Result<Device> {
	if let Some(serial) = serial {
		return devices
			.into_iter()
			.find(|d| d.serial == serial)
			.ok_or_else(|| Error::InvalidDevice(serial.to_string()));
	}

	match devices.len() {
		0 => Err(Error::NoDevice),
		1 => Ok(devices.into_iter().next().ok_or(Error::NoDevice)?),
		_ => {
			if !interactive {
				return Err(Error::InvalidDevice(
					"several devices attached, pick one with --serial".to_string(),
				));
			}
			let labels: Vec<String> = devices.iter().map(|d| format!("{} {}", d.name, d.serial)).collect();
			let index = Select::with_theme(&ColorfulTheme::default())
				.with_prompt("Which device?")
				.items(&labels)
				.default(0)
				.interact()?;
			devices
				.into_iter()
				.nth(index)
				.ok_or_else(|| Error::InvalidDevice(index.to_string()))
		}
	}
}

pub(crate) fn format_device_report(models: &[String]) -> String {
	let mut lines = vec!["List of connected devices:".to_string(), "-".repeat(27)];
	lines.extend(models.iter().cloned());
	lines.join("\n")
}

#[cfg(test)]
mod test {
	use std::time::Duration;

	use crate::app::{choose_device, format_device_report, select_device};
	use crate::error::Error;
	use crate::inventory::{parse_device_line, parse_devices};
	use crate::test::test::{
		devices_output, fake_session, init_log, FakeClock, FakeExecutor, Reply, EMULATOR_LINE, PHYSICAL_LINE,
	};

	#[test]
	fn test_install_release() {
		init_log();
		let executor = FakeExecutor::new();
		executor.exit("adb -s R58M12ABCDE uninstall org.internetwatchdogs.androidmonitor", 1);
		let session = fake_session(&executor, &FakeClock::new());

		session
			.install_release(&parse_device_line(PHYSICAL_LINE))
			.expect("install failed");
		assert_eq!(
			vec![
				"adb -s R58M12ABCDE uninstall org.internetwatchdogs.androidmonitor",
				"adb -s R58M12ABCDE install -r /tmp/android-project/app/release/app-release.apk",
				"adb -s R58M12ABCDE shell pm list packages org.internetwatchdogs.androidmonitor",
			],
			executor.lines()
		);
	}

	#[test]
	fn test_install_failure_is_fatal() {
		let executor = FakeExecutor::new();
		executor.exit(
			"adb -s R58M12ABCDE install -r /tmp/android-project/app/release/app-release.apk",
			1,
		);
		let session = fake_session(&executor, &FakeClock::new());

		let result = session.install_release(&parse_device_line(PHYSICAL_LINE));
		assert!(matches!(result, Err(Error::CommandFailed { code: 1, .. })));
		assert_eq!(2, executor.lines().len());
	}

	#[test]
	fn test_start_app_uses_serial() {
		let executor = FakeExecutor::new();
		let session = fake_session(&executor, &FakeClock::new());
		let mut device = parse_device_line(EMULATOR_LINE);
		device.name = "Pixel_6_API_33".to_string();

		session.start_app(&device).expect("start failed");
		assert_eq!(
			vec![
				"adb -s emulator-5554 shell am force-stop org.internetwatchdogs.androidmonitor",
				"adb -s emulator-5554 shell monkey -p org.internetwatchdogs.androidmonitor 1",
			],
			executor.lines()
		);
	}

	#[test]
	fn test_uninstall_app() {
		let executor = FakeExecutor::new();
		executor.exit("adb -s R58M12ABCDE uninstall org.internetwatchdogs.androidmonitor", 1);
		let session = fake_session(&executor, &FakeClock::new());
		assert!(session.uninstall_app(&parse_device_line(PHYSICAL_LINE)).is_err());
	}

	#[test]
	fn test_shutdown_all_running_emulators() {
		let executor = FakeExecutor::new();
		executor
			.stdout(
				"adb devices -l",
				&devices_output(&[EMULATOR_LINE, PHYSICAL_LINE, "emulator-5556 device"]),
			)
			.exit("adb -s emulator-5554 emu kill", 1)
			.exit("adb -s emulator-5556 shell true", 1);
		let session = fake_session(&executor, &FakeClock::new());

		session.shutdown_all_running_emulators().expect("shutdown failed");
		assert_eq!(1, executor.count("adb -s emulator-5554 emu kill"));
		assert_eq!(1, executor.count("adb -s emulator-5556 emu kill"));
		assert_eq!(0, executor.count("adb -s R58M12ABCDE emu kill"));
		// only the emulator that accepted the kill is waited on
		assert_eq!(0, executor.count("adb -s emulator-5554 shell true"));
		assert_eq!(1, executor.count("adb -s emulator-5556 shell true"));
	}

	#[test]
	fn test_shutdown_waits_until_emulator_is_gone() {
		let clock = FakeClock::new();
		let executor = FakeExecutor::new().with_clock(&clock);
		executor
			.stdout("adb devices -l", &devices_output(&[EMULATOR_LINE]))
			.on(
				"adb -s emulator-5554 shell true",
				[Reply::Exit(0), Reply::Exit(0), Reply::Exit(0), Reply::Exit(1)],
			);
		let session = fake_session(&executor, &clock);

		session.shutdown_all_running_emulators().expect("shutdown failed");
		assert_eq!(4, executor.count("adb -s emulator-5554 shell true"));
		assert_eq!(Duration::from_secs(3), clock.elapsed());

		let lines = executor.lines();
		let kill = lines.iter().position(|l| l == "adb -s emulator-5554 emu kill").unwrap();
		let first_check = lines.iter().position(|l| l == "adb -s emulator-5554 shell true").unwrap();
		assert!(kill < first_check);
	}

	#[test]
	fn test_select_device() {
		let devices = parse_devices(&devices_output(&[EMULATOR_LINE, PHYSICAL_LINE]));

		let device = select_device(devices.clone(), Some("R58M12ABCDE")).unwrap();
		assert_eq!("R58M12ABCDE", device.serial);

		let result = select_device(devices.clone(), Some("nope"));
		assert!(matches!(result, Err(Error::InvalidDevice(_))));

		let device = select_device(devices[..1].to_vec(), None).unwrap();
		assert_eq!("emulator-5554", device.serial);

		assert!(matches!(select_device(vec![], None), Err(Error::NoDevice)));
	}

	#[test]
	fn test_several_devices_without_terminal() {
		let devices = parse_devices(&devices_output(&[EMULATOR_LINE, PHYSICAL_LINE]));

		let result = choose_device(devices.clone(), None, false);
		match result {
			Err(Error::InvalidDevice(message)) => assert!(message.contains("--serial")),
			other => panic!("unexpected result: {other:?}"),
		}

		let device = choose_device(devices, Some("emulator-5554"), false).unwrap();
		assert_eq!("emulator-5554", device.serial);
	}

	#[test]
	fn test_device_models() {
		let executor = FakeExecutor::new();
		executor
			.stdout(
				"adb devices -l",
				&devices_output(&[PHYSICAL_LINE, "0123456789ABCDEF unauthorized"]),
			)
			.stdout("adb -s R58M12ABCDE shell getprop ro.product.model", "SM-G973F");
		let session = fake_session(&executor, &FakeClock::new());

		let models = session.device_models().unwrap();
		assert_eq!(vec!["SM-G973F"], models);
		assert_eq!(
			"List of connected devices:\n---------------------------\nSM-G973F",
			format_device_report(&models)
		);
	}

	#[test]
	fn test_show_devices_watch_stops_on_interrupt() {
		let clock = FakeClock::new();
		let executor = FakeExecutor::new();
		let session = fake_session(&executor, &clock);
		session.show_devices(false).expect("show failed");
		assert_eq!(Duration::ZERO, clock.elapsed());

		session.context.interrupt.trigger();
		assert!(matches!(session.show_devices(true), Err(Error::Interrupted)));
	}
}
