use std::path::PathBuf;
use std::time::Instant;

use android_tester::app::select_device;
use android_tester::config::{API_LEVELS, DEFAULT_API_LEVEL};
use android_tester::error::Error;
use android_tester::result::Result;
use android_tester::types::{Context, Interrupt, Session};
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::level_filters::LevelFilter;
use tracing::{error, info};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(name = "android-tester", version, about, args_conflicts_with_subcommands = true)]
struct Cli {
	/// Root of the Android project (where gradlew lives)
	#[arg(long, global = true, env = "ANDROID_TESTER_PROJECT_ROOT")]
	project_root: Option<PathBuf>,

	/// -v for debug output, -vv for trace
	#[arg(short, long, global = true, action = ArgAction::Count)]
	verbose: u8,

	#[command(flatten)]
	test: TestArgs,

	#[command(subcommand)]
	command: Option<Command>,
}

#[derive(Args, Debug, Clone)]
struct TestArgs {
	/// API level of the emulator image to boot
	#[arg(
		short,
		long,
		default_value_t = DEFAULT_API_LEVEL,
		value_parser = clap::value_parser!(u8).range(API_LEVELS[0] as i64..=API_LEVELS[API_LEVELS.len() - 1] as i64)
	)]
	api: u8,

	/// Exit with the test task's exit code when tests fail
	#[arg(long)]
	fail_on_test_failure: bool,
}

#[derive(Subcommand, Debug)]
enum Command {
	/// Run the connected tests (default)
	Test(TestArgs),
	/// List the connected devices
	Devices {
		/// Refresh every second until interrupted
		#[arg(long)]
		watch: bool,
	},
	/// Install the release APK and start the app
	InstallRelease {
		#[arg(long)]
		serial: Option<String>,
	},
	/// Uninstall the app
	Uninstall {
		#[arg(long)]
		serial: Option<String>,
	},
}

fn init_log(verbose: u8) -> WorkerGuard {
	use tracing_subscriber::prelude::*;

	let level = match verbose {
		0 => LevelFilter::INFO,
		1 => LevelFilter::DEBUG,
		_ => LevelFilter::TRACE,
	};

	let (non_blocking, guard) = tracing_appender::non_blocking(std::io::stdout());
	let layer = tracing_subscriber::fmt::layer()
		.with_thread_names(false)
		.with_thread_ids(false)
		.with_line_number(false)
		.with_file(false)
		.with_target(verbose > 1)
		.with_level(true)
		.with_writer(non_blocking);

	let filter = EnvFilter::builder()
		.with_default_directive(level.into())
		.from_env_lossy();

	tracing_subscriber::registry().with(layer).with(filter).init();
	guard
}

fn run(cli: Cli) -> Result<()> {
	let interrupt = Interrupt::install()?;
	let project_root = match cli.project_root {
		Some(root) => root,
		None => std::env::current_dir()?,
	};
	let command = cli.command.unwrap_or(Command::Test(cli.test));
	let fail_on_test_failure = matches!(&command, Command::Test(args) if args.fail_on_test_failure);

	let context = Context::new(project_root)
		.with_debug(cli.verbose > 1)
		.with_interrupt(interrupt)
		.with_fail_on_test_failure(fail_on_test_failure);
	let session = Session::system(context)?;
	info!("Using adb={} emulator={} gradle={}", session.toolchain.adb, session.toolchain.emulator, session.toolchain.gradle);

	match command {
		Command::Test(args) => {
			let outcomes = session.run_tests(Some(args.api))?;
			for outcome in outcomes {
				info!("Connected tests {outcome}");
			}
		}
		Command::Devices { watch } => session.show_devices(watch)?,
		Command::InstallRelease { serial } => {
			let device = select_device(session.list_live_devices()?, serial.as_deref())?;
			session.install_release(&device)?;
			session.start_app(&device)?;
			println!("Done");
		}
		Command::Uninstall { serial } => {
			let device = select_device(session.list_live_devices()?, serial.as_deref())?;
			session.uninstall_app(&device)?;
		}
	}
	Ok(())
}

fn main() {
	let cli = Cli::parse();
	let guard = init_log(cli.verbose);
	let start = Instant::now();

	let code = match run(cli) {
		Ok(()) => {
			info!("Total time: {:.2} seconds", start.elapsed().as_secs_f64());
			0
		}
		Err(Error::Interrupted) => {
			println!("\nExiting...");
			0
		}
		Err(err) => {
			error!("{err}");
			err.exit_code()
		}
	};

	drop(guard);
	std::process::exit(code);
}
