//! Status lines for the terminal. Everything goes to stderr so stdout carries
//! only the report.

use crate::ui::{theme, Icons};
use owo_colors::OwoColorize;
use std::time::Duration;

pub fn success(label: &str) {
    eprintln!("{} {}", Icons::CHECK, label.style(theme().success.clone()));
}

pub fn error(label: &str) {
    eprintln!("{} {}", Icons::CROSS, label.style(theme().error.clone()));
}

pub fn warn(label: &str) {
    eprintln!("{} {}", Icons::WARN, label.style(theme().warn.clone()));
}

pub fn info(label: &str, value: &str) {
    eprintln!(
        "{} {}: {}",
        Icons::INFO.style(theme().info.clone()),
        label.style(theme().dim.clone()),
        value
    );
}

pub fn timing(elapsed: Duration, files: usize, functions: usize, calls: usize) {
    eprintln!(
        "{} {}  {} {}  {} {}  {} {}",
        Icons::CLOCK.style(theme().dim.clone()),
        indicatif::HumanDuration(elapsed),
        Icons::FILE.style(theme().info.clone()),
        files,
        Icons::SPAGHETTI.style(theme().info.clone()),
        functions,
        Icons::LINK.style(theme().info.clone()),
        calls
    );
}
