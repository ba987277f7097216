use std::path::Path;
use std::sync::LazyLock;

use regex::Regex;
use thiserror::Error;

/// `<title><sep><issue>` with optional trailing `(...)` groups such as a year
/// or scanner tag.
static TITLE_ISSUE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?P<title>.+?)[\s._\-]*#?(?P<issue>\d+(?:\.\d+)?)[a-zA-Z]?\s*(?:\([^)]*\)\s*)*$")
        .expect("valid regex")
});

#[derive(Debug, Error, PartialEq, Eq)]
pub enum FilenameError {
    #[error("file has no extension: {0}")]
    NoExtension(String),

    #[error("file name is not valid UTF-8: {0}")]
    NotUtf8(String),

    #[error("file name does not look like `<title> <issue number>`: {0}")]
    Unmatched(String),
}

/// Title and issue label guessed from an archive's file name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchTerms {
    pub title: String,
    pub issue: String,
}

impl SearchTerms {
    pub fn from_path(path: &Path) -> Result<Self, FilenameError> {
        let display = path.display().to_string();
        if path.extension().is_none() {
            return Err(FilenameError::NoExtension(display));
        }
        let stem = path
            .file_stem()
            .and_then(|s| s.to_str())
            .ok_or_else(|| FilenameError::NotUtf8(display.clone()))?;
        Self::from_stem(stem).ok_or(FilenameError::Unmatched(display))
    }

    fn from_stem(stem: &str) -> Option<Self> {
        let caps = TITLE_ISSUE_RE.captures(stem.trim())?;
        let title = caps["title"]
            .replace(['_', '.'], " ")
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        if !title.chars().any(char::is_alphabetic) {
            return None;
        }

        let issue = &caps["issue"];
        let trimmed = issue.trim_start_matches('0');
        let issue = if trimmed.is_empty() || trimmed.starts_with('.') {
            format!("0{trimmed}")
        } else {
            trimmed.to_owned()
        };

        Some(Self { title, issue })
    }

    /// Free-text query sent to the catalog search endpoint.
    pub fn query(&self) -> String {
        format!("{} {}", self.title, self.issue).to_lowercase()
    }
}
