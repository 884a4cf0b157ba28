use tracing::{debug, info, warn};

use crate::config::{
	BOOT_POLICY, COMMAND_TIMEOUT, EMULATOR_LAUNCH_ARGS, LAUNCH_GRACE_PERIOD, LAUNCH_POLICY, QUERY_TIMEOUT, SETTLE_DELAY,
};
use crate::error::Error;
use crate::prelude::InvocationExt;
use crate::result::Result;
use crate::traits::Process;
use crate::types::{BringupState, Invocation, RunningDevice, Session};

impl Session {
	/// Returns a booted emulator, launching one when none is running.
	///
	/// The returned [`RunningDevice`] shuts the emulator down when dropped, whether it was
	/// launched here or reused.
	pub fn bringup_emulator(&self, api: Option<u8>) -> Result<RunningDevice<'_>> {
		enter(BringupState::Searching);
		let (device, process) = match self.first_live_emulator()? {
			Some(device) => {
				info!("Found running emulator {device}");
				(device, None)
			}
			None => {
				enter(BringupState::Launching);
				let avd = self
					.list_available_images(api)?
					.into_iter()
					.next()
					.ok_or(Error::NoEmulatorImage(api))?;

				let log = std::env::temp_dir().join(format!("emulator-{avd}.log"));
				info!("Launching emulator {avd}, output in {}", log.display());
				let mut process = self.spawn(
					Invocation::new(&self.toolchain.emulator).args(["-avd", avd.as_str()]).args(EMULATOR_LAUNCH_ARGS),
					Some(&log),
				)?;
				debug!("emulator pid: {}", process.id());

				self.sleep(LAUNCH_GRACE_PERIOD);
				let found = LAUNCH_POLICY.poll(self.clock(), |_| {
					self.context.interrupt.check()?;
					Ok(self.list_live_devices()?.into_iter().find(|d| d.emulator))
				});

				match found {
					Ok(Some(device)) => (device, Some(process)),
					Ok(None) => {
						warn!("No emulator device came online, killing emulator {avd}");
						kill_quietly(process.as_mut());
						return Err(Error::NoEmulatorDevice);
					}
					Err(err) => {
						kill_quietly(process.as_mut());
						return Err(err);
					}
				}
			}
		};

		enter(BringupState::WaitingForBoot);
		let running = RunningDevice::new(self, device, process);
		self.wait_for_device(running.serial())?;

		if self.wait_for_boot(running.serial())? {
			self.sleep(SETTLE_DELAY);
			enter(BringupState::Ready);
		} else {
			warn!("Timeout reached, device may still be booting.");
		}
		Ok(running)
	}

	fn wait_for_device(&self, serial: &str) -> Result<()> {
		self.exec_best_effort(
			Invocation::adb(&self.toolchain.adb)
				.serial(serial)
				.arg("wait-for-device")
				.timeout(Some(COMMAND_TIMEOUT)),
		)
	}

	/// true once `sys.boot_completed` reads 1, false when the boot budget is spent
	fn wait_for_boot(&self, serial: &str) -> Result<bool> {
		let booted = BOOT_POLICY.poll(self.clock(), |attempt| {
			self.context.interrupt.check()?;
			let value = self
				.capture(
					Invocation::shell(&self.toolchain.adb, serial)
						.args(["getprop", "sys.boot_completed"])
						.timeout(Some(QUERY_TIMEOUT)),
				)
				.unwrap_or_default();
			debug!("boot_completed[{attempt}]: '{value}'");
			Ok((value == "1").then_some(()))
		})?;
		Ok(booted.is_some())
	}
}

fn enter(state: BringupState) {
	info!("Bring-up state: {state}");
}

fn kill_quietly(process: &mut dyn Process) {
	if let Err(err) = process.kill() {
		warn!("Failed to kill emulator process {}: {err}", process.id());
	}
}

#[cfg(test)]
mod test {
	use std::time::Duration;

	use crate::error::Error;
	use crate::test::test::{
		devices_output, fake_session, init_log, CallKind, FakeClock, FakeExecutor, Reply, EMULATOR_LINE, PHYSICAL_LINE,
	};

	const BOOT_PROPERTY: &str = "adb -s emulator-5554 shell getprop sys.boot_completed";
	const LAUNCH: &str = "emulator -avd Pixel_6_API_33 -no-snapshot-load -no-snapshot-save";

	#[test]
	fn test_reuses_live_emulator() {
		init_log();
		let clock = FakeClock::new();
		let executor = FakeExecutor::new().with_clock(&clock);
		executor
			.stdout("adb devices -l", &devices_output(&[EMULATOR_LINE]))
			.stdout(BOOT_PROPERTY, "1");
		let session = fake_session(&executor, &clock);

		let mut running = session.bringup_emulator(Some(33)).expect("bring-up failed");
		assert_eq!("emulator-5554", running.serial());
		assert_eq!(0, executor.count("emulator -list-avds"));
		assert!(executor.calls().iter().all(|c| c.kind != CallKind::Spawn));
		assert_eq!(Duration::from_secs(5), clock.elapsed());

		running.kill();
		assert_eq!(0, executor.kills());
		assert_eq!(1, executor.count("adb -s emulator-5554 emu kill"));
	}

	#[test]
	fn test_launches_when_none_running() {
		init_log();
		let clock = FakeClock::new();
		let executor = FakeExecutor::new().with_clock(&clock);
		let empty = Reply::Stdout(devices_output(&[PHYSICAL_LINE]));
		let mut replies = vec![empty; 21];
		replies.push(Reply::Stdout(devices_output(&[PHYSICAL_LINE, EMULATOR_LINE])));
		executor
			.on("adb devices -l", replies)
			.stdout("emulator -list-avds", "Pixel_4_API_30\nPixel_6_API_33\nTV_API_33")
			.stdout(BOOT_PROPERTY, "1");
		let session = fake_session(&executor, &clock);

		let running = session.bringup_emulator(Some(33)).expect("bring-up failed");
		assert_eq!("emulator-5554", running.serial());

		let launch = executor.find(LAUNCH).expect("emulator was not launched");
		assert_eq!(CallKind::Spawn, launch.kind);
		assert_eq!(Some("0"), launch.env("ANDROID_EMULATOR_WAIT_TIME_BEFORE_KILL"));
		assert_eq!(Duration::ZERO, launch.at);

		// 20 search attempts, then the grace period and one more poll at 1s
		assert_eq!(22, executor.count("adb devices -l"));
		let wait = executor.find("adb -s emulator-5554 wait-for-device").expect("no wait-for-device");
		assert_eq!(Duration::from_secs(11), wait.at);
		assert_eq!(Duration::from_secs(16), clock.elapsed());

		drop(running);
		assert_eq!(1, executor.kills());
	}

	#[test]
	fn test_interrupt_during_boot_tears_down_launched_emulator() {
		init_log();
		let clock = FakeClock::new();
		let executor = FakeExecutor::new().with_clock(&clock);
		let mut replies = vec![Reply::Stdout(devices_output(&[])); 21];
		replies.push(Reply::Stdout(devices_output(&[EMULATOR_LINE])));
		executor
			.on("adb devices -l", replies)
			.stdout("emulator -list-avds", "Pixel_6_API_33")
			.stdout(BOOT_PROPERTY, "0")
			.exit("adb -s emulator-5554 shell true", 1);
		let session = fake_session(&executor, &clock);
		executor.interrupt_on(BOOT_PROPERTY, &session.context.interrupt);

		let result = session.bringup_emulator(None);
		assert!(matches!(result, Err(Error::Interrupted)));
		assert_eq!(1, executor.count(BOOT_PROPERTY));
		assert_eq!(1, executor.kills());
		assert_eq!(1, executor.count("adb -s emulator-5554 emu kill"));
	}

	#[test]
	fn test_no_image() {
		let executor = FakeExecutor::new();
		executor
			.stdout("adb devices -l", &devices_output(&[]))
			.stdout("emulator -list-avds", "INFO    | Storing crashdata\nPixel_4_API_30");
		let session = fake_session(&executor, &FakeClock::new());

		let result = session.bringup_emulator(Some(33));
		assert!(matches!(result, Err(Error::NoEmulatorImage(Some(33)))));
		assert!(executor.calls().iter().all(|c| c.kind != CallKind::Spawn));
	}

	#[test]
	fn test_no_device_after_launch_kills_process() {
		let clock = FakeClock::new();
		let executor = FakeExecutor::new();
		executor
			.stdout("adb devices -l", &devices_output(&[]))
			.stdout("emulator -list-avds", "Pixel_6_API_33");
		let session = fake_session(&executor, &clock);

		let result = session.bringup_emulator(None);
		assert!(matches!(result, Err(Error::NoEmulatorDevice)));
		assert_eq!(1, executor.kills());
		assert_eq!(Duration::from_secs(70), clock.elapsed());
		assert_eq!(0, executor.count("adb -s emulator-5554 emu kill"));
	}

	#[test]
	fn test_boot_completed_on_third_poll() {
		init_log();
		let clock = FakeClock::new();
		let executor = FakeExecutor::new().with_clock(&clock);
		executor
			.stdout("adb devices -l", &devices_output(&[EMULATOR_LINE]))
			.on(
				BOOT_PROPERTY,
				[Reply::Exit(1), Reply::Stdout("0".into()), Reply::Stdout("1".into())],
			);
		let session = fake_session(&executor, &clock);

		let running = session.bringup_emulator(None).expect("bring-up failed");
		assert_eq!(3, executor.count(BOOT_PROPERTY));
		// two 500ms intervals, then the settle delay
		assert_eq!(Duration::from_secs(6), clock.elapsed());
		assert_eq!("emulator-5554", running.device().serial);
	}

	#[test]
	fn test_boot_timeout_still_returns_device() {
		let clock = FakeClock::new();
		let executor = FakeExecutor::new();
		executor
			.stdout("adb devices -l", &devices_output(&[EMULATOR_LINE]))
			.stdout(BOOT_PROPERTY, "0");
		let session = fake_session(&executor, &clock);

		let running = session.bringup_emulator(None).expect("bring-up failed");
		assert_eq!(121, executor.count(BOOT_PROPERTY));
		assert_eq!(Duration::from_secs(60), clock.elapsed());
		assert_eq!("emulator-5554", running.serial());
	}

	#[test]
	fn test_wait_for_device_failure_is_not_fatal() {
		let executor = FakeExecutor::new();
		executor
			.stdout("adb devices -l", &devices_output(&[EMULATOR_LINE]))
			.exit("adb -s emulator-5554 wait-for-device", 1)
			.stdout(BOOT_PROPERTY, "1");
		let session = fake_session(&executor, &FakeClock::new());
		assert!(session.bringup_emulator(None).is_ok());
	}

	#[test]
	fn test_interrupted_search() {
		let executor = FakeExecutor::new();
		let session = fake_session(&executor, &FakeClock::new());
		session.context.interrupt.trigger();
		assert!(matches!(session.bringup_emulator(None), Err(Error::Interrupted)));
		assert!(executor.calls().is_empty());
	}
}
