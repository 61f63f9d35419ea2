//! Live adapter for the `InteractivePrompt` port reading a terminal.

use std::io::{self, BufRead, BufReader, Write};
use std::sync::Mutex;

use crate::ports::InteractivePrompt;

/// Asks questions on a writer (stderr by default) and reads answers line by line.
pub struct TerminalPrompt {
    reader: Mutex<Box<dyn BufRead + Send>>,
    writer: Mutex<Box<dyn Write + Send>>,
}

impl TerminalPrompt {
    /// Creates a prompt over arbitrary reader and writer streams.
    pub fn new(reader: impl BufRead + Send + 'static, writer: impl Write + Send + 'static) -> Self {
        Self { reader: Mutex::new(Box::new(reader)), writer: Mutex::new(Box::new(writer)) }
    }

    /// Creates a prompt reading stdin and writing to stderr, leaving stdout for reports.
    #[must_use]
    pub fn stdio() -> Self {
        Self::new(BufReader::new(io::stdin()), io::stderr())
    }

    fn ask(&self, question: &str) -> Result<bool, String> {
        let mut writer = self.writer.lock().map_err(|_| "prompt writer lock poisoned".to_string())?;
        let mut reader = self.reader.lock().map_err(|_| "prompt reader lock poisoned".to_string())?;
        loop {
            write!(writer, "{question} [y/n] ").map_err(|e| format!("write error: {e}"))?;
            writer.flush().map_err(|e| format!("flush error: {e}"))?;

            let mut line = String::new();
            let read = reader.read_line(&mut line).map_err(|e| format!("read error: {e}"))?;
            if read == 0 {
                return Err("input closed before an answer was given".into());
            }
            match parse_answer(&line) {
                Some(answer) => return Ok(answer),
                None => writeln!(writer, "Please answer 'y' or 'n'.")
                    .map_err(|e| format!("write error: {e}"))?,
            }
        }
    }
}

fn parse_answer(line: &str) -> Option<bool> {
    match line.trim().to_ascii_lowercase().as_str() {
        "y" | "yes" => Some(true),
        "n" | "no" => Some(false),
        _ => None,
    }
}

impl InteractivePrompt for TerminalPrompt {
    fn ask_yes_no(&self, prompt: &str) -> Result<bool, String> {
        self.ask(prompt)
    }

    fn ask_checklist(&self, items: &[String]) -> Result<Vec<bool>, String> {
        let total = items.len();
        items
            .iter()
            .enumerate()
            .map(|(i, item)| self.ask(&format!("[{}/{total}] {item}", i + 1)))
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use std::io::Cursor;

    use super::*;

    fn scripted(input: &str) -> TerminalPrompt {
        TerminalPrompt::new(Cursor::new(input.to_string().into_bytes()), io::sink())
    }

    #[test]
    fn reads_yes_and_no() {
        assert_eq!(scripted("yes\n").ask_yes_no("ok?"), Ok(true));
        assert_eq!(scripted("N\n").ask_yes_no("ok?"), Ok(false));
    }

    #[test]
    fn reprompts_on_unclear_answers() {
        assert_eq!(scripted("maybe\n\ny\n").ask_yes_no("ok?"), Ok(true));
    }

    #[test]
    fn closed_input_is_an_error() {
        assert!(scripted("").ask_yes_no("ok?").is_err());
    }

    #[test]
    fn checklist_asks_each_item() {
        let items = vec!["a".to_string(), "b".to_string(), "c".to_string()];
        assert_eq!(scripted("y\nn\ny\n").ask_checklist(&items), Ok(vec![true, false, true]));
    }
}
