//! CLI output formatting module
//!
//! Human or JSON rendering of command results, report tables and progress
//! spinners.

pub mod progress;
pub mod table;

use serde::Serialize;

pub use progress::{create_spinner_with_message, ProgressBarExt};
pub use table::TableFormatter;

pub trait CommandOutput: Serialize {
    fn to_human(&self) -> String;
    fn to_json(&self) -> serde_json::Value;
}

pub fn output<T: CommandOutput>(result: &T, json_mode: bool) {
    if json_mode {
        println!("{}", serde_json::to_string_pretty(&result.to_json()).unwrap_or_default());
    } else {
        println!("{}", result.to_human());
    }
}
