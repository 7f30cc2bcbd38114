//! Cursor-backed view over a raw command line.
//!
//! The tree walker consumes input token by token, snapshots the cursor
//! before speculative branches, and rewinds it when a branch fails. All
//! tokenization is plain whitespace splitting; the cursor is a byte offset
//! into the backing string, so rewinding restores read behavior exactly.

/// A cursor over a command line string.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CommandInput {
    buffer: String,
    cursor: usize,
}

impl CommandInput {
    /// Wrap a raw input string with the cursor at the start.
    pub fn new(input: impl Into<String>) -> Self {
        Self {
            buffer: input.into(),
            cursor: 0,
        }
    }

    /// The full backing string, including consumed input.
    pub fn input(&self) -> &str {
        &self.buffer
    }

    /// The current cursor position (byte offset into the backing string).
    pub fn cursor(&self) -> usize {
        self.cursor
    }

    /// Move the cursor to `position`.
    ///
    /// Positions are only meaningful if previously obtained from
    /// [`cursor`](Self::cursor); the walker uses this to rewind after a
    /// failed branch.
    pub fn set_cursor(&mut self, position: usize) {
        self.cursor = position.min(self.buffer.len());
    }

    /// The unconsumed remainder of the input.
    pub fn remaining_input(&self) -> &str {
        &self.buffer[self.cursor..]
    }

    /// Whether the cursor has reached the end of the buffer.
    pub fn is_empty(&self) -> bool {
        self.cursor >= self.buffer.len()
    }

    /// Whether nothing but whitespace remains.
    pub fn is_empty_ignoring_whitespace(&self) -> bool {
        self.remaining_input().chars().all(char::is_whitespace)
    }

    /// Number of whitespace-separated tokens left.
    ///
    /// Trailing whitespace counts as one more (empty) token: "alice " is a
    /// finished token plus the empty token now being typed. Completion
    /// relies on the distinction to move on to the next component.
    pub fn remaining_tokens(&self) -> usize {
        let remaining = self.remaining_input();
        let count = remaining.split_whitespace().count();
        if !remaining.is_empty() && remaining.ends_with(char::is_whitespace) {
            count + 1
        } else {
            count
        }
    }

    /// The final token of the remaining input, or an empty string.
    pub fn last_remaining_token(&self) -> String {
        self.remaining_input()
            .split_whitespace()
            .last()
            .unwrap_or("")
            .to_string()
    }

    /// The next token without advancing, or an empty string if exhausted.
    pub fn peek_string(&self) -> String {
        let remaining = self.remaining_input();
        let start = remaining
            .find(|c: char| !c.is_whitespace())
            .unwrap_or(remaining.len());
        let rest = &remaining[start..];
        let end = rest
            .find(char::is_whitespace)
            .unwrap_or(rest.len());
        rest[..end].to_string()
    }

    /// Read the next token: skip leading whitespace, consume the token,
    /// and leave the cursor at the token's end.
    ///
    /// The separator after the token stays in the buffer; it is skipped by
    /// the next read. Keeping it makes "token followed by a space" and
    /// "token at end of input" distinguishable, which the suggester relies
    /// on to decide between completing the token and descending past it.
    pub fn read_string(&mut self) -> String {
        let remaining = self.remaining_input();
        let start = remaining
            .find(|c: char| !c.is_whitespace())
            .unwrap_or(remaining.len());
        let rest = &remaining[start..];
        let end = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let token = rest[..end].to_string();
        self.cursor += start + end;
        token
    }

    /// Consume everything that remains, minus leading whitespace.
    pub fn read_remaining(&mut self) -> String {
        let rest = self.remaining_input().trim_start().to_string();
        self.cursor = self.buffer.len();
        rest
    }

    /// Logically append `text` to the input buffer as a further token.
    ///
    /// Used to re-feed textual default values through a component parser.
    pub fn append_string(&mut self, text: &str) {
        if !self.buffer.is_empty() && !self.buffer.ends_with(char::is_whitespace) {
            self.buffer.push(' ');
        }
        self.buffer.push_str(text);
    }

    /// A detached snapshot of this input.
    pub fn copy(&self) -> Self {
        self.clone()
    }

    /// The tokens consumed between `snapshot` (an earlier cursor value)
    /// and the current cursor.
    pub fn consumed_since(&self, snapshot: usize) -> Vec<String> {
        let from = snapshot.min(self.cursor);
        self.buffer[from..self.cursor]
            .split_whitespace()
            .map(str::to_string)
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn peek_does_not_advance() {
        let input = CommandInput::new("foo bar");
        assert_eq!(input.peek_string(), "foo");
        assert_eq!(input.peek_string(), "foo");
        assert_eq!(input.cursor(), 0);
    }

    #[test]
    fn read_advances_token_by_token() {
        let mut input = CommandInput::new("foo bar baz");
        assert_eq!(input.read_string(), "foo");
        assert_eq!(input.peek_string(), "bar");
        assert_eq!(input.read_string(), "bar");
        assert_eq!(input.read_string(), "baz");
        assert!(input.is_empty());
        assert_eq!(input.read_string(), "");
    }

    #[test]
    fn trailing_whitespace_stays_after_read() {
        let mut input = CommandInput::new("foo ");
        assert_eq!(input.read_string(), "foo");
        assert!(!input.is_empty());
        assert!(input.is_empty_ignoring_whitespace());
        assert_eq!(input.remaining_tokens(), 1);
    }

    #[test]
    fn adjacent_whitespace_is_not_its_own_token() {
        let mut input = CommandInput::new("foo   bar");
        assert_eq!(input.remaining_tokens(), 2);
        assert_eq!(input.read_string(), "foo");
        assert_eq!(input.read_string(), "bar");
        assert!(input.is_empty());
    }

    #[test]
    fn cursor_rewind_restores_read_behavior() {
        let mut input = CommandInput::new("alpha beta gamma");
        let snapshot = input.cursor();
        assert_eq!(input.read_string(), "alpha");
        assert_eq!(input.read_string(), "beta");
        input.set_cursor(snapshot);
        assert_eq!(input.read_string(), "alpha");
    }

    #[test]
    fn empty_checks() {
        let input = CommandInput::new("  ");
        assert!(!input.is_empty());
        assert!(input.is_empty_ignoring_whitespace());
        assert_eq!(input.peek_string(), "");
        // Whitespace-only input is the empty token being typed.
        assert_eq!(input.remaining_tokens(), 1);
    }

    #[test]
    fn remaining_tokens_counts_the_token_being_typed() {
        assert_eq!(CommandInput::new("alice").remaining_tokens(), 1);
        assert_eq!(CommandInput::new("alice ").remaining_tokens(), 2);
        assert_eq!(CommandInput::new("alice  ").remaining_tokens(), 2);
        assert_eq!(CommandInput::new("").remaining_tokens(), 0);
    }

    #[test]
    fn last_remaining_token() {
        let mut input = CommandInput::new("one two three");
        input.read_string();
        assert_eq!(input.last_remaining_token(), "three");
    }

    #[test]
    fn append_inserts_separator_when_needed() {
        let mut input = CommandInput::new("give");
        input.read_string();
        assert!(input.is_empty());
        input.append_string("42");
        assert!(!input.is_empty());
        assert_eq!(input.peek_string(), "42");
    }

    #[test]
    fn append_to_empty_buffer() {
        let mut input = CommandInput::new("");
        input.append_string("token");
        assert_eq!(input.read_string(), "token");
    }

    #[test]
    fn consumed_since_reports_token_span() {
        let mut input = CommandInput::new("foo bar baz");
        let snapshot = input.cursor();
        input.read_string();
        input.read_string();
        assert_eq!(input.consumed_since(snapshot), vec!["foo", "bar"]);
    }

    #[test]
    fn read_remaining_takes_everything() {
        let mut input = CommandInput::new("say hello world");
        input.read_string();
        assert_eq!(input.read_remaining(), "hello world");
        assert!(input.is_empty());
    }
}
