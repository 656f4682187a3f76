//! Input security scan, sanitization and schema validation.
//!
//! The scan always runs on the raw text, before sanitization, so that a
//! rejected payload is never quietly cleaned up and let through.

use regex::Regex;
use std::sync::OnceLock;

use crate::config::Settings;
use crate::domain::FileHandle;
use crate::error::{FieldViolation, PipelineError};

const ALLOWED_CONTENT_TYPES: &[&str] = &[
    "application/pdf",
    "application/msword",
    "application/vnd.openxmlformats-officedocument.wordprocessingml.document",
    "text/plain",
    "image/jpeg",
    "image/jpg",
    "image/png",
    "image/webp",
    "image/heic",
    "image/heif",
];

const ZERO_WIDTH: &[char] = &['\u{200B}', '\u{200C}', '\u{200D}', '\u{2060}', '\u{FEFF}'];

fn unsafe_patterns() -> &'static [(Regex, &'static str)] {
    static PATTERNS: OnceLock<Vec<(Regex, &'static str)>> = OnceLock::new();
    PATTERNS.get_or_init(|| {
        [
            (r"(?i)<\s*script\b", "script tag"),
            (r"(?i)<\s*/\s*script\s*>", "script tag"),
            (r"(?i)<\s*(iframe|object|embed)\b", "embedded frame"),
            (r"(?i)javascript\s*:", "javascript URL"),
            (r"(?i)vbscript\s*:", "vbscript URL"),
            (r"(?i)data\s*:\s*text/html", "HTML data URL"),
            (r"(?i)<[a-z][^<>\n]*[\s/]on[a-z]+\s*=", "inline event handler"),
        ]
        .into_iter()
        .map(|(pattern, label)| (Regex::new(pattern).expect("static pattern"), label))
        .collect()
    })
}

fn blank_line_runs() -> &'static Regex {
    static RUNS: OnceLock<Regex> = OnceLock::new();
    RUNS.get_or_init(|| Regex::new(r"\n{3,}").expect("static pattern"))
}

/// Size, count and type constraints for one request.
#[derive(Debug, Clone)]
pub struct ValidationLimits {
    pub max_text_chars: usize,
    pub max_files: usize,
    pub max_file_bytes: usize,
}

impl Default for ValidationLimits {
    fn default() -> Self {
        Self::from(&Settings::default())
    }
}

impl From<&Settings> for ValidationLimits {
    fn from(s: &Settings) -> Self {
        Self {
            max_text_chars: s.max_text_chars,
            max_files: s.max_files,
            max_file_bytes: s.max_file_bytes,
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct SecurityValidator {
    limits: ValidationLimits,
}

impl SecurityValidator {
    pub fn new(limits: ValidationLimits) -> Self {
        Self { limits }
    }

    /// Scan, sanitize and validate a submission. Returns the sanitized text,
    /// which is empty for file-only requests.
    pub fn validate(&self, text: Option<&str>, files: &[FileHandle]) -> Result<String, PipelineError> {
        let raw = text.unwrap_or_default();

        scan(raw)?;
        let sanitized = sanitize(raw);
        self.check_schema(&sanitized, files)?;

        Ok(sanitized)
    }

    fn check_schema(&self, text: &str, files: &[FileHandle]) -> Result<(), PipelineError> {
        let mut violations = Vec::new();

        if text.is_empty() && files.is_empty() {
            violations.push(FieldViolation::new(
                "request",
                "either text or at least one file is required",
            ));
        }

        let chars = text.chars().count();
        if chars > self.limits.max_text_chars {
            violations.push(FieldViolation::new(
                "text",
                format!(
                    "must be at most {} characters (got {})",
                    self.limits.max_text_chars, chars
                ),
            ));
        }

        if files.len() > self.limits.max_files {
            violations.push(FieldViolation::new(
                "files",
                format!("at most {} files are allowed (got {})", self.limits.max_files, files.len()),
            ));
        }

        for (i, file) in files.iter().enumerate() {
            let name = file.name();
            if name.trim().is_empty() {
                violations.push(FieldViolation::new(format!("files[{i}].name"), "is required"));
            } else if name.chars().any(char::is_control) || name.contains(|c: char| c == '/' || c == '\\') {
                violations.push(FieldViolation::new(
                    format!("files[{i}].name"),
                    "contains invalid characters",
                ));
            }

            let content_type = normalize_content_type(file.content_type());
            if content_type.is_empty() {
                violations.push(FieldViolation::new(format!("files[{i}].type"), "is required"));
            } else if !ALLOWED_CONTENT_TYPES.contains(&content_type.as_str()) {
                violations.push(FieldViolation::new(
                    format!("files[{i}].type"),
                    format!("unsupported file type '{content_type}'"),
                ));
            }

            let size = file.approx_size();
            if size > self.limits.max_file_bytes {
                violations.push(FieldViolation::new(
                    format!("files[{i}].size"),
                    format!("must be at most {} bytes", self.limits.max_file_bytes),
                ));
            } else if size == 0 && matches!(file, FileHandle::Binary { .. }) {
                violations.push(FieldViolation::new(format!("files[{i}].size"), "file is empty"));
            }
        }

        if violations.is_empty() {
            Ok(())
        } else {
            Err(PipelineError::Validation(violations))
        }
    }
}

/// Reject known injection markers and control characters.
pub fn scan(raw: &str) -> Result<(), PipelineError> {
    if let Some(c) = raw
        .chars()
        .find(|c| c.is_control() && !matches!(c, '\n' | '\r' | '\t'))
    {
        return Err(PipelineError::SecurityViolation(format!(
            "Text contains a disallowed control character (U+{:04X})",
            c as u32
        )));
    }

    // Zero-width characters must not split a marker past the patterns
    let visible: String = raw.chars().filter(|c| !ZERO_WIDTH.contains(c)).collect();
    for (pattern, label) in unsafe_patterns() {
        if pattern.is_match(&visible) {
            return Err(PipelineError::SecurityViolation(format!(
                "Text contains unsafe content ({label})"
            )));
        }
    }

    Ok(())
}

/// Normalize line endings, drop zero-width characters, collapse blank runs and trim.
pub fn sanitize(raw: &str) -> String {
    let unified = raw.replace("\r\n", "\n").replace('\r', "\n");
    let stripped: String = unified.chars().filter(|c| !ZERO_WIDTH.contains(c)).collect();
    let lines = stripped
        .lines()
        .map(str::trim_end)
        .collect::<Vec<_>>()
        .join("\n");

    blank_line_runs()
        .replace_all(&lines, "\n\n")
        .trim()
        .to_string()
}

fn normalize_content_type(raw: &str) -> String {
    raw.split(';').next().unwrap_or_default().trim().to_lowercase()
}
