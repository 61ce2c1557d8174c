//! Terminal output helpers for the CLI

use colored::*;

const RULE_WIDTH: usize = 60;

pub fn print_header(title: &str) {
    let line = "─".repeat(RULE_WIDTH);
    println!("{}", line.black().bold());

    let name = "toolgate".yellow().bold();
    let version = format!("v{}", env!("CARGO_PKG_VERSION")).black().bold();
    println!("  {} {}  {}", name, version, title.cyan());

    println!("{}", line.black().bold());
}

pub fn print_step(msg: &str) {
    println!("  {} {}", "•".green(), msg);
}

pub fn print_success(msg: &str) {
    println!("  {} {}", "✓".green().bold(), msg.green());
}

pub fn print_warning(msg: &str) {
    println!("  {} {}", "⚠️ ".yellow().bold(), msg.yellow());
}

pub fn print_error(msg: &str) {
    println!("  {} {}", "❌".red().bold(), msg.red());
}

/// `label: value`, with the value dimmed when it is not set
pub fn print_field(label: &str, value: Option<&str>) {
    match value {
        Some(v) => println!("  {:<22} {}", format!("{}:", label), v),
        None => println!("  {:<22} {}", format!("{}:", label), "not set".black().bold()),
    }
}
