//! Boots an Android emulator (or picks up attached devices), runs the project's connected
//! tests against it through Gradle, and shuts the emulator down afterwards.
//!
//! Every operation hangs off a [`types::Session`], which owns the command executor, the clock
//! used for all waiting, the located SDK tools and the run [`types::Context`].

pub mod app;
pub mod clock;
pub mod command;
pub mod config;
pub mod error;
pub mod inventory;
pub mod result;
pub mod traits;
pub mod types;
pub mod utils;

pub(crate) mod adb;
pub(crate) mod bringup;
pub(crate) mod context;
pub(crate) mod impls;
pub(crate) mod prelude;
pub(crate) mod retry;
pub(crate) mod session;
pub(crate) mod teardown;
pub(crate) mod test_runner;
