//! Interactive prompt port for human confirmation.

/// Collects answers from a human.
pub trait InteractivePrompt: Send + Sync {
    /// Asks a yes/no question.
    ///
    /// # Errors
    ///
    /// Returns an error if no answer can be read (closed input, I/O failure).
    fn ask_yes_no(&self, prompt: &str) -> Result<bool, String>;

    /// Asks for confirmation of each item, returning one answer per item.
    ///
    /// # Errors
    ///
    /// Returns an error if no answer can be read (closed input, I/O failure).
    fn ask_checklist(&self, items: &[String]) -> Result<Vec<bool>, String>;
}
