use crate::errors::ValidationError;
use crate::models::{Attachment, Submission};

/// File names longer than this are shortened in previews.
pub const DISPLAY_NAME_LIMIT: usize = 20;
/// Auto-grow ceiling for the input box, in text rows.
pub const MAX_ROWS: u16 = 6;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileKind {
    Image,
    Pdf,
    Text,
    Code,
    Generic,
}

impl FileKind {
    pub fn from_name(name: &str) -> Self {
        let ext = extension(name).map(|e| e.to_ascii_lowercase());
        match ext.as_deref() {
            Some("png" | "jpg" | "jpeg" | "gif" | "bmp" | "webp" | "svg") => FileKind::Image,
            Some("pdf") => FileKind::Pdf,
            Some("txt" | "md" | "rtf" | "csv" | "doc" | "docx" | "odt") => FileKind::Text,
            Some(
                "rs" | "py" | "js" | "ts" | "jsx" | "tsx" | "html" | "css" | "json" | "toml"
                | "yaml" | "yml" | "sh" | "c" | "cpp" | "h" | "java" | "go" | "rb",
            ) => FileKind::Code,
            _ => FileKind::Generic,
        }
    }

    pub fn icon(self) -> &'static str {
        match self {
            FileKind::Image => "🖼",
            FileKind::Pdf => "📕",
            FileKind::Text => "📄",
            FileKind::Code => "💻",
            FileKind::Generic => "📎",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilePreview {
    pub index: usize,
    pub kind: FileKind,
    pub display_name: String,
}

fn extension(name: &str) -> Option<&str> {
    let (stem, ext) = name.rsplit_once('.')?;
    (!stem.is_empty() && !ext.is_empty()).then_some(ext)
}

/// `first N chars + "…" + extension` once the name exceeds the limit.
pub fn display_name(name: &str) -> String {
    if name.chars().count() <= DISPLAY_NAME_LIMIT {
        return name.to_string();
    }
    let head: String = name.chars().take(DISPLAY_NAME_LIMIT).collect();
    match extension(name) {
        Some(ext) => format!("{head}…{ext}"),
        None => format!("{head}…"),
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnterAction {
    /// Plain Enter on a non-empty draft.
    Submit,
    Newline,
    /// Plain Enter on an empty draft: nothing happens.
    Ignored,
}

#[derive(Debug, Clone)]
pub struct Composer {
    input: Vec<char>,
    cursor: usize,
    files: Vec<Attachment>,
    rows: u16,
}

impl Default for Composer {
    fn default() -> Self {
        Self {
            input: Vec::new(),
            cursor: 0,
            files: Vec::new(),
            rows: 1,
        }
    }
}

impl Composer {
    pub fn text(&self) -> String {
        self.input.iter().collect()
    }

    pub fn set_text(&mut self, text: &str) {
        self.input = text.chars().collect();
        self.cursor = self.input.len();
        self.resize();
    }

    pub fn is_blank(&self) -> bool {
        self.input.iter().all(|c| c.is_whitespace())
    }

    pub fn cursor(&self) -> usize {
        self.cursor
    }

    pub fn rows(&self) -> u16 {
        self.rows
    }

    /// (row, column) of the cursor within the draft.
    pub fn cursor_position(&self) -> (usize, usize) {
        let before = &self.input[..self.cursor.min(self.input.len())];
        let row = before.iter().filter(|c| **c == '\n').count();
        let col = before.iter().rev().take_while(|c| **c != '\n').count();
        (row, col)
    }

    pub fn insert_char(&mut self, ch: char) {
        self.cursor = self.cursor.min(self.input.len());
        self.input.insert(self.cursor, ch);
        self.cursor += 1;
        self.resize();
    }

    pub fn insert_newline(&mut self) {
        self.insert_char('\n');
    }

    pub fn backspace(&mut self) {
        if self.cursor > 0 && self.cursor <= self.input.len() {
            self.cursor -= 1;
            self.input.remove(self.cursor);
            self.resize();
        }
    }

    pub fn delete(&mut self) {
        if self.cursor < self.input.len() {
            self.input.remove(self.cursor);
            self.resize();
        }
    }

    pub fn move_left(&mut self) {
        self.cursor = self.cursor.saturating_sub(1);
    }

    pub fn move_right(&mut self) {
        self.cursor = (self.cursor + 1).min(self.input.len());
    }

    pub fn move_home(&mut self) {
        self.cursor = 0;
    }

    pub fn move_end(&mut self) {
        self.cursor = self.input.len();
    }

    /// Grow to fit the content, capped at `MAX_ROWS`.
    fn resize(&mut self) {
        let lines = self.input.iter().filter(|c| **c == '\n').count() + 1;
        self.rows = u16::try_from(lines).unwrap_or(MAX_ROWS).clamp(1, MAX_ROWS);
    }

    pub fn on_enter(&self, newline_modifier: bool) -> EnterAction {
        if newline_modifier {
            EnterAction::Newline
        } else if self.is_blank() {
            EnterAction::Ignored
        } else {
            EnterAction::Submit
        }
    }

    pub fn files(&self) -> &[Attachment] {
        &self.files
    }

    pub fn attach(&mut self, file: Attachment) {
        self.files.push(file);
    }

    /// Removes exactly the file at `index`; out of range is a no-op.
    pub fn remove_file(&mut self, index: usize) -> Option<Attachment> {
        (index < self.files.len()).then(|| self.files.remove(index))
    }

    pub fn previews(&self) -> Vec<FilePreview> {
        self.files
            .iter()
            .enumerate()
            .map(|(index, f)| FilePreview {
                index,
                kind: FileKind::from_name(&f.name),
                display_name: display_name(&f.name),
            })
            .collect()
    }

    /// Takes the draft as a submission and resets the composer.
    /// A blank prompt is rejected and leaves the draft untouched.
    pub fn build_submission(&mut self) -> Result<Submission, ValidationError> {
        let text = self.text();
        let prompt = text.trim();
        if prompt.is_empty() {
            return Err(ValidationError::EmptyPrompt);
        }
        let submission = Submission {
            prompt: prompt.to_string(),
            files: std::mem::take(&mut self.files),
        };
        self.input.clear();
        self.cursor = 0;
        self.rows = 1;
        Ok(submission)
    }
}
