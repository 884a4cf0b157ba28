use std::time::Duration;

use crate::types::RetryPolicy;

pub const APP_PACKAGE_NAME: &str = "org.internetwatchdogs.androidmonitor";
pub const APP_PACKAGE_TEST_NAME: &str = "org.internetwatchdogs.androidmonitor.test";

/// Relative to the project root
pub const RELEASE_APK: &str = "app/release/app-release.apk";

pub const TEST_TASK: &str = "connectedCheck";

pub const SERIAL_ENV: &str = "ANDROID_SERIAL";
pub const EMULATOR_WAIT_TIME_BEFORE_KILL: (&str, &str) = ("ANDROID_EMULATOR_WAIT_TIME_BEFORE_KILL", "0");

pub const API_LEVELS: [u8; 6] = [28, 29, 30, 31, 32, 33];
pub const DEFAULT_API_LEVEL: u8 = 33;

pub const EMULATOR_LAUNCH_ARGS: [&str; 2] = ["-no-snapshot-load", "-no-snapshot-save"];

pub const LAUNCH_GRACE_PERIOD: Duration = Duration::from_secs(10);
pub const SETTLE_DELAY: Duration = Duration::from_secs(5);
pub const COMMAND_TIMEOUT: Duration = Duration::from_secs(60);
pub const QUERY_TIMEOUT: Duration = Duration::from_secs(10);

pub const SEARCH_POLICY: RetryPolicy = RetryPolicy::attempts(20);
pub const LAUNCH_POLICY: RetryPolicy = RetryPolicy::every(Duration::from_secs(1), Duration::from_secs(60));
pub const BOOT_POLICY: RetryPolicy = RetryPolicy::every(Duration::from_millis(500), Duration::from_secs(60));
pub const TEARDOWN_POLICY: RetryPolicy = RetryPolicy::every(Duration::from_secs(1), Duration::from_secs(60));

pub const WATCH_INTERVAL: Duration = Duration::from_secs(1);
