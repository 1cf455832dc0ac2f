//! Step outputs and failure reporting in the CI runner's formats.

use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::Path;

use colored::Colorize;
use uuid::Uuid;

pub const OUTPUT_FILE_VAR: &str = "GITHUB_OUTPUT";

/// Publish a step output. Appends to the runner's output file when one is
/// configured, otherwise prints `name=value` to stdout.
pub fn set_output(name: &str, value: &str) -> io::Result<()> {
    match std::env::var(OUTPUT_FILE_VAR) {
        Ok(path) if !path.is_empty() => append_output(Path::new(&path), name, value),
        _ => {
            println!("{name}={value}");
            Ok(())
        }
    }
}

pub fn append_output(path: &Path, name: &str, value: &str) -> io::Result<()> {
    let entry = output_entry(name, value, &format!("ghadelimiter_{}", Uuid::new_v4()))?;
    let mut file = OpenOptions::new().create(true).append(true).open(path)?;
    file.write_all(entry.as_bytes())
}

fn output_entry(name: &str, value: &str, delimiter: &str) -> io::Result<String> {
    if name.contains(delimiter) || value.contains(delimiter) {
        return Err(io::Error::new(
            io::ErrorKind::InvalidInput,
            format!("output {name} contains the delimiter {delimiter}"),
        ));
    }
    Ok(format!("{name}<<{delimiter}\n{value}\n{delimiter}\n"))
}

/// Report a failed run: a workflow `::error::` command on stdout and a
/// readable line on stderr.
pub fn set_failed(message: &str) {
    println!("::error::{}", escape_command_data(message));
    print_error(message);
}

/// Escape a workflow command payload so it stays on one line.
pub fn escape_command_data(message: &str) -> String {
    message
        .replace('%', "%25")
        .replace('\r', "%0D")
        .replace('\n', "%0A")
}

pub fn print_success(msg: &str) {
    eprintln!("{} {}", "✓".green(), msg);
}

pub fn print_error(msg: &str) {
    eprintln!("{} {}", "✗".red(), msg);
}
