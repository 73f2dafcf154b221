// src/ui.rs

use crate::{constants, symbols};
use colored::*;
use indicatif::{ProgressBar, ProgressStyle};
use std::{
    io::{self, Write},
    time::Duration,
};

pub fn print_header(title: &str) {
    println!("\n{}", "═".repeat(constants::UI_WIDTH));
    println!(" {}", title.cyan().bold());
    println!("{}", "═".repeat(constants::UI_WIDTH));
}

pub fn print_sub_header(title: &str) {
    println!("\n--- {} ---", title.bold());
}

pub fn box_message(title: &str, content: &[&str], color_func: fn(ColoredString) -> ColoredString) {
    println!("\n┌{}┐", "─".repeat(constants::UI_WIDTH - 2));
    println!("  {}", color_func(title.bold()));
    println!("├{}┤", "─".repeat(constants::UI_WIDTH - 2));
    for line in content {
        println!("  {}", line);
    }
    println!("└{}┘", "─".repeat(constants::UI_WIDTH - 2));
}

pub fn plain(message: &str) {
    println!("{}", message);
}

pub fn info(message: &str) {
    println!("{} {}", *symbols::INFO, message);
}

pub fn warn(message: &str) {
    println!("{} {}", *symbols::WARN, message.yellow());
}

pub fn success(message: &str) {
    println!("{} {}", *symbols::OK, message);
}

pub fn error(message: &str) {
    eprintln!("{} {}", *symbols::ERROR, message.red());
}

/// 返回 Ok("") 表示用户输入空行；读到 EOF 时返回错误
pub fn prompt(message: &str, default: Option<&str>) -> io::Result<String> {
    let default_str = default.map_or("".to_string(), |d| format!(" (默认: {})", d));
    print!("\n>>> {}{}: ", message, default_str);
    io::stdout().flush()?;
    let mut input = String::new();
    if io::stdin().read_line(&mut input)? == 0 {
        return Err(io::Error::from(io::ErrorKind::UnexpectedEof));
    }
    let input = input.trim().to_string();
    if input.is_empty() {
        Ok(default.unwrap_or("").to_string())
    } else {
        Ok(input)
    }
}

pub fn new_bytes_progress_bar(total: u64, prefix: &str) -> ProgressBar {
    let style = ProgressStyle::with_template(
        "{prefix:7.bold.cyan} [{elapsed_precise}] [{bar:40.cyan/blue}] {bytes}/{total_bytes} ({bytes_per_sec}, ETA: {eta})",
    )
    .unwrap_or_else(|_| ProgressStyle::default_bar())
    .progress_chars("#>-");
    let pbar = ProgressBar::new(total);
    pbar.set_style(style);
    pbar.set_prefix(prefix.to_string());
    pbar
}

/// 服务器未返回内容长度时使用
pub fn new_spinner(prefix: &str) -> ProgressBar {
    let style = ProgressStyle::with_template(
        "{prefix:7.bold.cyan} {spinner:.green} [{elapsed_precise}] {bytes} ({bytes_per_sec})",
    )
    .unwrap_or_else(|_| ProgressStyle::default_spinner());
    let pbar = ProgressBar::new_spinner();
    pbar.set_style(style);
    pbar.set_prefix(prefix.to_string());
    pbar.enable_steady_tick(Duration::from_millis(120));
    pbar
}
