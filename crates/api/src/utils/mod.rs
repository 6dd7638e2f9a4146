//! Helpers shared by command implementations

pub mod command_helpers;
pub mod logging;

pub use command_helpers::execute_logged;
