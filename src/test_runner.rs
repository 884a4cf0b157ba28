use tracing::{info, warn};

use crate::config::{APP_PACKAGE_NAME, APP_PACKAGE_TEST_NAME, COMMAND_TIMEOUT, SERIAL_ENV, TEST_TASK};
use crate::error::Error;
use crate::inventory::filter_physical;
use crate::prelude::InvocationExt;
use crate::result::Result;
use crate::types::{Device, Invocation, Session, SettingsType, Target, TestOutcome};

const BANNER_WIDTH: usize = 80;

/// `settings put` calls keeping a plugged in device awake and unlocked
static STAY_AWAKE_SETTINGS: [(SettingsType, &str, &str); 3] = [
	(SettingsType::global, "stay_on_while_plugged_in", "3"),
	(SettingsType::system, "screen_off_timeout", "2147483647"),
	(SettingsType::secure, "lockscreen.disabled", "1"),
];

impl Target<'_, '_> {
	pub fn device(&self) -> &Device {
		match self {
			Target::Emulator(running) => running.device(),
			Target::Physical(device) => device,
		}
	}

	pub fn serial(&self) -> &str {
		&self.device().serial
	}
}

impl TestOutcome {
	pub fn success(&self) -> bool {
		self.code == 0
	}
}

impl Session {
	/// Runs the connected test task against a single device.
	///
	/// A failing test task is reported through the returned [`TestOutcome`] and only turned
	/// into an error when the context asks for it.
	pub fn run_connected_test(&self, target: Target) -> Result<TestOutcome> {
		let serial = target.serial();
		println!();
		println!("{}", "#".repeat(BANNER_WIDTH));
		println!("# {target}");
		println!("{}", "#".repeat(BANNER_WIDTH));
		println!();

		if let Target::Emulator(running) = &target {
			for package in self.list_packages(running.device(), Some(APP_PACKAGE_NAME)) {
				self.exec(
					Invocation::adb(&self.toolchain.adb)
						.serial(serial)
						.args(["uninstall", package.as_str()])
						.timeout(Some(COMMAND_TIMEOUT)),
				)?;
			}
		}

		let invocation = Invocation::new(&self.toolchain.gradle)
			.arg(TEST_TASK)
			.current_dir(&self.context.project_root)
			.env(SERIAL_ENV, serial)
			.ignore_errors(true);
		let command = invocation.to_string();
		let outcome = TestOutcome {
			code: self.exec(invocation)?,
		};

		if outcome.success() {
			info!("Tests passed on {serial}");
		} else if self.context.fail_on_test_failure {
			return Err(Error::CommandFailed {
				command,
				code: outcome.code,
			});
		} else {
			warn!("Tests failed on {serial} with exit code {}", outcome.code);
		}
		Ok(outcome)
	}

	/// Removes previous installs, then runs the tests on a physical device
	pub fn physical_device_run(&self, device: &Device) -> Result<TestOutcome> {
		for package in [APP_PACKAGE_NAME, APP_PACKAGE_TEST_NAME] {
			self.exec_best_effort(
				Invocation::adb(&self.toolchain.adb)
					.serial(&device.serial)
					.args(["uninstall", package])
					.timeout(Some(COMMAND_TIMEOUT)),
			)?;
		}
		self.run_connected_test(Target::Physical(device))
	}

	pub fn stay_awake(&self, devices: &[Device]) -> Result<()> {
		for device in devices {
			for (settings_type, key, value) in STAY_AWAKE_SETTINGS.iter() {
				self.context.interrupt.check()?;
				let namespace: &str = settings_type.into();
				let invocation = Invocation::shell(&self.toolchain.adb, &device.serial)
					.args(["settings", "put", namespace, *key, *value])
					.timeout(Some(COMMAND_TIMEOUT));
				info!("Running: {invocation}");
				match self.capture(invocation) {
					Ok(output) if !output.is_empty() => info!("{output}"),
					Ok(_) => {}
					Err(err) => warn!("Error: {err}"),
				}
			}
		}
		Ok(())
	}

	/// Default flow: tests run on every attached physical device, or on an emulator when
	/// there is none. Emulators left over from a previous run are shut down first.
	pub fn run_tests(&self, api: Option<u8>) -> Result<Vec<TestOutcome>> {
		self.shutdown_all_running_emulators()?;
		let physical = filter_physical(self.list_live_devices()?);

		if physical.is_empty() {
			info!("No physical devices found, running on emulator");
			let running = self.bringup_emulator(api)?;
			match self.list_available_images(None) {
				Ok(avds) => info!("Available emulators: {}", avds.join(", ")),
				Err(err) => warn!("Failed to list emulators: {err}"),
			}
			let outcome = self.run_connected_test(Target::Emulator(&running))?;
			Ok(vec![outcome])
		} else {
			info!("Physical devices found, running on physical device(s)");
			self.stay_awake(&physical)?;
			physical.iter().map(|device| self.physical_device_run(device)).collect()
		}
	}
}
