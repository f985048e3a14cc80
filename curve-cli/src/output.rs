//! Output abstraction for testable printing

use serde::Serialize;

use crate::error::CliResult;

/// Output abstraction for printing results
pub trait Output: Send + Sync {
    /// Print normal output
    fn print(&self, msg: &str) -> CliResult<()>;

    /// Print error message
    fn error(&self, msg: &str) -> CliResult<()>;

    /// Print a section header
    fn header(&self, title: &str) -> CliResult<()> {
        self.print(&format!("\n{}\n{}", title, "=".repeat(title.len())))
    }
}

/// Print any serializable value as pretty JSON
///
/// Serializes straight to text so `u128` amounts above `u64::MAX` stay exact.
pub fn print_json<T: Serialize + ?Sized>(output: &dyn Output, data: &T) -> CliResult<()> {
    output.print(&serde_json::to_string_pretty(data)?)
}

/// Standard console output implementation
pub struct ConsoleOutput;

impl Output for ConsoleOutput {
    fn print(&self, msg: &str) -> CliResult<()> {
        println!("{}", msg);
        Ok(())
    }

    fn error(&self, msg: &str) -> CliResult<()> {
        eprintln!("error: {}", msg);
        Ok(())
    }
}

/// Captures everything printed; used by tests and embedding callers
#[derive(Debug, Default)]
pub struct CapturedOutput {
    messages: std::sync::Mutex<Vec<String>>,
    errors: std::sync::Mutex<Vec<String>>,
}

impl CapturedOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn messages(&self) -> Vec<String> {
        self.messages.lock().map(|m| m.clone()).unwrap_or_default()
    }

    pub fn errors(&self) -> Vec<String> {
        self.errors.lock().map(|e| e.clone()).unwrap_or_default()
    }
}

impl Output for CapturedOutput {
    fn print(&self, msg: &str) -> CliResult<()> {
        if let Ok(mut messages) = self.messages.lock() {
            messages.push(msg.to_string());
        }
        Ok(())
    }

    fn error(&self, msg: &str) -> CliResult<()> {
        if let Ok(mut errors) = self.errors.lock() {
            errors.push(msg.to_string());
        }
        Ok(())
    }
}
