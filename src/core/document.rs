//! Open markdown documents and the line editing surface

use std::ops::Range;

use super::vault;

/// Cursor location in an editor
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Position {
    pub line: usize,
    pub ch: usize,
}

/// Line-oriented editing surface handed to plugins on editor changes
pub trait Editor {
    /// Current cursor position
    fn cursor(&self) -> Position;

    /// Text of a line, without its terminator
    fn line(&self, n: usize) -> Option<&str>;

    /// Replace the text of a line
    fn set_line(&mut self, n: usize, text: &str);
}

/// A markdown document held open by the application
#[derive(Debug, Clone)]
pub struct Document {
    /// Vault path
    pub path: String,
    lines: Vec<String>,
    trailing_newline: bool,
    cursor: Position,
    /// Whether an editor wrote to the buffer since it was loaded
    pub modified: bool,
}

impl Document {
    /// Create a document buffer from its text
    pub fn new(path: impl Into<String>, content: &str) -> Self {
        let trailing_newline = content.ends_with('\n');
        let body = content.strip_suffix('\n').unwrap_or(content);
        let lines = if content.is_empty() {
            vec![String::new()]
        } else {
            body.split('\n').map(str::to_string).collect()
        };

        Self {
            path: path.into(),
            lines,
            trailing_newline,
            cursor: Position::default(),
            modified: false,
        }
    }

    /// Place the cursor at the end of the last line that differs from
    /// `previous`, which is where an edit that produced this text ended up.
    pub fn with_cursor_after_edit(mut self, previous: &str) -> Self {
        let changed = changed_lines(previous, &self.content());
        let line = changed
            .end
            .saturating_sub(1)
            .max(changed.start)
            .min(self.lines.len() - 1);
        self.cursor = Position {
            line,
            ch: self.lines[line].chars().count(),
        };
        self
    }

    #[cfg(test)]
    pub fn set_cursor(&mut self, cursor: Position) {
        self.cursor = cursor;
    }

    /// Full text of the document
    pub fn content(&self) -> String {
        let mut text = self.lines.join("\n");
        if self.trailing_newline {
            text.push('\n');
        }
        text
    }

    #[cfg(test)]
    pub fn line_count(&self) -> usize {
        self.lines.len()
    }
}

impl Editor for Document {
    fn cursor(&self) -> Position {
        self.cursor
    }

    fn line(&self, n: usize) -> Option<&str> {
        self.lines.get(n).map(String::as_str)
    }

    fn set_line(&mut self, n: usize, text: &str) {
        if let Some(line) = self.lines.get_mut(n) {
            if line != text {
                *line = text.to_string();
                self.modified = true;
            }
        }
    }
}

/// Whether `path` names a markdown file
pub fn is_markdown(path: &str) -> bool {
    vault::extension(path)
        .map(|ext| ext.eq_ignore_ascii_case("md") || ext.eq_ignore_ascii_case("markdown"))
        .unwrap_or(false)
}

/// Lines of `current` that differ from `previous`, after trimming the lines
/// both texts share at the start and at the end
pub fn changed_lines(previous: &str, current: &str) -> Range<usize> {
    let old: Vec<&str> = previous.lines().collect();
    let new: Vec<&str> = current.lines().collect();
    let prefix = old.iter().zip(&new).take_while(|(a, b)| a == b).count();
    let suffix = old[prefix..]
        .iter()
        .rev()
        .zip(new[prefix..].iter().rev())
        .take_while(|(a, b)| a == b)
        .count();
    prefix..new.len() - suffix
}
