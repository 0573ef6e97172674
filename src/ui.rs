use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use colored::{ColoredString, Colorize};

/// User-facing output sink.
///
/// Every component that reports progress receives a `&Console` instead of
/// printing directly, so tests can capture what a run displayed.
pub struct Console {
    out: Mutex<Box<dyn Write + Send>>,
    styled: bool,
}

/// In-memory buffer shared with a captured `Console`
#[derive(Clone, Default)]
pub struct CapturedOutput(Arc<Mutex<Vec<u8>>>);

impl CapturedOutput {
    pub fn contents(&self) -> String {
        String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
    }
}

impl Write for CapturedOutput {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl Console {
    pub fn stdout() -> Self {
        Self {
            out: Mutex::new(Box::new(io::stdout())),
            styled: true,
        }
    }

    /// Unstyled console writing into a buffer the caller can inspect
    pub fn captured() -> (Self, CapturedOutput) {
        let buffer = CapturedOutput::default();
        let console = Self {
            out: Mutex::new(Box::new(buffer.clone())),
            styled: false,
        };
        (console, buffer)
    }

    pub fn line(&self, text: impl AsRef<str>) {
        let mut out = match self.out.lock() {
            Ok(out) => out,
            Err(poisoned) => poisoned.into_inner(),
        };
        let _ = writeln!(out, "{}", text.as_ref());
        let _ = out.flush();
    }

    pub fn blank(&self) {
        self.line("");
    }

    pub fn header(&self, text: &str) {
        let rule = "─".repeat(text.chars().count() + 4);
        self.blank();
        self.line(self.paint(&rule, |s| s.cyan().bold()));
        self.line(self.paint(&format!("  {}", text), |s| s.cyan().bold()));
        self.line(self.paint(&rule, |s| s.cyan().bold()));
        self.blank();
    }

    pub fn step(&self, step: usize, total: usize, title: &str) {
        self.blank();
        self.line(self.paint(&format!("[{}/{}] {}", step, total, title), |s| s.cyan().bold()));
    }

    pub fn success(&self, text: &str) {
        self.line(self.paint(&format!("✓ {}", text), |s| s.green()));
    }

    pub fn error(&self, text: &str) {
        self.line(self.paint(&format!("✗ {}", text), |s| s.red().bold()));
    }

    pub fn warning(&self, text: &str) {
        self.line(self.paint(&format!("⚠ {}", text), |s| s.yellow()));
    }

    pub fn info(&self, text: &str) {
        self.line(self.paint(&format!("ℹ {}", text), |s| s.cyan()));
    }

    /// Indented `label: value` row used in summaries
    pub fn field(&self, label: &str, value: &str) {
        self.line(format!("  {}: {}", label, self.paint(value, |s| s.cyan())));
    }

    fn paint(&self, text: &str, style: impl Fn(&str) -> ColoredString) -> String {
        if self.styled {
            style(text).to_string()
        } else {
            text.to_string()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_captured_console_is_unstyled() {
        let (console, output) = Console::captured();
        console.success("Repository created");
        console.warning("Skipping");
        console.field("Name", "wt-demo");

        let text = output.contents();
        assert!(text.contains("✓ Repository created\n"));
        assert!(text.contains("⚠ Skipping\n"));
        assert!(text.contains("  Name: wt-demo\n"));
        assert!(!text.contains('\u{1b}'), "captured output must not contain ANSI escapes");
    }

    #[test]
    fn test_step_format() {
        let (console, output) = Console::captured();
        console.step(2, 4, "Creating Repository");
        assert!(output.contents().contains("[2/4] Creating Repository"));
    }
}
