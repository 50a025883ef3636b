//! Single-line text input for the search prompt.

/// A text input with a cursor counted in characters, not bytes.
#[derive(Clone, Debug, Default)]
pub struct InputField {
    value: String,
    cursor: usize,
}

impl InputField {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start editing `value` with the cursor at its end.
    pub fn with_value(value: &str) -> Self {
        Self { value: value.to_string(), cursor: value.chars().count() }
    }

    pub fn value(&self) -> &str {
        &self.value
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    fn byte_offset(&self, chars: usize) -> usize {
        self.value
            .char_indices()
            .nth(chars)
            .map(|(i, _)| i)
            .unwrap_or(self.value.len())
    }

    /// Insert a character at the cursor.
    pub fn handle_char(&mut self, c: char) {
        let at = self.byte_offset(self.cursor);
        self.value.insert(at, c);
        self.cursor += 1;
    }

    /// Delete the character before the cursor.
    pub fn handle_backspace(&mut self) {
        if self.cursor > 0 {
            self.cursor -= 1;
            let at = self.byte_offset(self.cursor);
            self.value.remove(at);
        }
    }

    /// Delete the character under the cursor.
    pub fn handle_delete(&mut self) {
        if self.cursor < self.value.chars().count() {
            let at = self.byte_offset(self.cursor);
            self.value.remove(at);
        }
    }

    pub fn move_cursor_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_cursor_right(&mut self) {
        if self.cursor < self.value.chars().count() {
            self.cursor += 1;
        }
    }

    pub fn clear(&mut self) {
        self.value.clear();
        self.cursor = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn edits_multibyte_text_by_character() {
        let mut input = InputField::with_value("café");
        input.handle_backspace();
        assert_eq!(input.value(), "caf");
        input.handle_char('é');
        input.move_cursor_left();
        input.move_cursor_left();
        input.handle_char('-');
        assert_eq!(input.value(), "ca-fé");
        input.handle_delete();
        assert_eq!(input.value(), "ca-é");
        assert_eq!(input.cursor(), 3);
    }

    #[test]
    fn cursor_stays_in_bounds() {
        let mut input = InputField::new();
        input.move_cursor_left();
        input.handle_backspace();
        input.handle_delete();
        input.move_cursor_right();
        assert_eq!(input.cursor(), 0);
        input.handle_char('a');
        input.clear();
        assert_eq!(input.value(), "");
    }
}
