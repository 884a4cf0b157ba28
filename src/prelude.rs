use crate::types::{Adb, Invocation};

pub(crate) trait InvocationExt {
	/// Targets a single device with `-s <serial>`
	fn serial(self, serial: &str) -> Self;

	fn shell(adb: &Adb, serial: &str) -> Invocation;

	fn adb(adb: &Adb) -> Invocation;
}

impl InvocationExt for Invocation {
	fn serial(self, serial: &str) -> Self {
		self.args(["-s", serial])
	}

	fn shell(adb: &Adb, serial: &str) -> Invocation {
		Invocation::adb(adb).serial(serial).arg("shell")
	}

	fn adb(adb: &Adb) -> Invocation {
		Invocation::new(adb)
	}
}
