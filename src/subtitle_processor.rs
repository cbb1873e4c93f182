use std::fmt;
use std::sync::Arc;

use log::{debug, warn};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::errors::SubtitleError;

// @module: Subtitle ingestion and the entry data model

// @const: One SRT/VTT-style timestamp (hours optional, fraction optional)
static TIMESTAMP_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:\d{1,3}:)?\d{1,2}:\d{2}(?:[,.]\d{1,3})?$").expect("timestamp regex is valid")
});

// @const: Timing line, `START --> END` followed by optional cue settings
static TIMING_LINE_REGEX: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(\S+)\s*-->\s*(\S+)(?:\s+.*)?$").expect("timing line regex is valid")
});

// @struct: Single timed caption unit
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SubtitleEntry {
    // @field: 1-based position assigned at ingestion
    pub id: u64,

    // @field: Start timestamp, verbatim from the source file
    pub start_time: String,

    // @field: End timestamp, verbatim from the source file
    pub end_time: String,

    // @field: Source-language text
    pub original_text: String,

    // @field: Translation, empty until translated
    #[serde(default)]
    pub translated_text: String,
}

impl SubtitleEntry {
    /// Creates an untranslated entry
    pub fn new(id: u64, start_time: impl Into<String>, end_time: impl Into<String>, original_text: impl Into<String>) -> Self {
        Self {
            id,
            start_time: start_time.into(),
            end_time: end_time.into(),
            original_text: original_text.into(),
            translated_text: String::new(),
        }
    }

    /// Returns a copy of this entry carrying `translated_text`
    pub fn with_translation(&self, translated_text: impl Into<String>) -> Self {
        Self {
            translated_text: translated_text.into(),
            ..self.clone()
        }
    }

    /// Whether a translation has been filled in
    pub fn is_translated(&self) -> bool {
        !self.translated_text.is_empty()
    }
}

impl fmt::Display for SubtitleEntry {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "{}", self.id)?;
        writeln!(f, "{} --> {}", self.start_time, self.end_time)?;
        writeln!(f, "{}", self.original_text)?;
        writeln!(f)
    }
}

/// A raw timed record as produced by a parser, before ids are assigned
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedCue {
    pub start_time: String,
    pub end_time: String,
    pub text: String,
}

/// Maps raw subtitle text to an ordered sequence of timed records.
///
/// Implementations must return cues in file order and must not reorder them.
pub trait SubtitleParser: Send + Sync + fmt::Debug {
    fn parse(&self, content: &str) -> Result<Vec<ParsedCue>, SubtitleError>;
}

/// Strict SubRip parser.
///
/// A block is an optional numeric counter, one timing line and zero or more
/// text lines; blocks are separated by blank lines. A valid timing line inside
/// a block also starts a new cue.
#[derive(Debug, Default, Clone, Copy)]
pub struct SrtParser;

impl SrtParser {
    fn parse_timing(line: &str, line_number: usize) -> Result<(String, String), SubtitleError> {
        let caps = TIMING_LINE_REGEX.captures(line).ok_or_else(|| SubtitleError::Malformed {
            line: line_number,
            message: format!("expected a timing line 'START --> END', found '{}'", line),
        })?;

        let start = &caps[1];
        let end = &caps[2];
        for timestamp in [start, end] {
            if !TIMESTAMP_REGEX.is_match(timestamp) {
                return Err(SubtitleError::Malformed {
                    line: line_number,
                    message: format!("invalid timestamp '{}'", timestamp),
                });
            }
        }

        Ok((start.to_string(), end.to_string()))
    }

    fn is_counter(line: &str) -> bool {
        line.trim().parse::<u64>().is_ok()
    }

    fn is_timing_line(line: &str) -> bool {
        TIMING_LINE_REGEX
            .captures(line.trim())
            .is_some_and(|caps| TIMESTAMP_REGEX.is_match(&caps[1]) && TIMESTAMP_REGEX.is_match(&caps[2]))
    }

    fn parse_block(block: &[(usize, &str)]) -> Result<ParsedCue, SubtitleError> {
        let mut lines = block.iter().peekable();

        // Counter line is optional; anything numeric before the timing line is skipped
        if let Some((_, first)) = lines.peek() {
            if Self::is_counter(first) {
                lines.next();
            }
        }

        let (line_number, timing) = lines.next().ok_or_else(|| SubtitleError::Malformed {
            line: block.last().map_or(1, |(n, _)| *n),
            message: "subtitle counter is not followed by a timing line".to_string(),
        })?;
        let (start_time, end_time) = Self::parse_timing(timing.trim(), *line_number)?;

        let text = lines.map(|(_, l)| l.trim_end()).collect::<Vec<_>>().join("\n");

        Ok(ParsedCue { start_time, end_time, text })
    }
}

impl SubtitleParser for SrtParser {
    fn parse(&self, content: &str) -> Result<Vec<ParsedCue>, SubtitleError> {
        let normalized = content.replace("\r\n", "\n").replace('\r', "\n");

        let mut cues = Vec::new();
        let mut block: Vec<(usize, &str)> = Vec::new();

        for (idx, line) in normalized.lines().enumerate() {
            if line.trim().is_empty() {
                if !block.is_empty() {
                    cues.push(Self::parse_block(&block)?);
                    block.clear();
                }
                continue;
            }
            if Self::is_timing_line(line) {
                if let Some(timing_at) = block.iter().position(|(_, l)| Self::is_timing_line(l)) {
                    // Next cue started without a blank line, its counter belongs to it
                    let has_counter = block.len() > timing_at + 1
                        && block.last().is_some_and(|(_, last)| Self::is_counter(last));
                    let counter = if has_counter { block.pop() } else { None };
                    cues.push(Self::parse_block(&block)?);
                    block.clear();
                    block.extend(counter);
                }
            }
            block.push((idx + 1, line));
        }

        if !block.is_empty() {
            cues.push(Self::parse_block(&block)?);
        }

        debug!("Parsed {} subtitle cues", cues.len());
        Ok(cues)
    }
}

/// Converts uploaded bytes into addressable subtitle entries
#[derive(Debug, Clone)]
pub struct SubtitleIngestor {
    parser: Arc<dyn SubtitleParser>,
}

impl Default for SubtitleIngestor {
    fn default() -> Self {
        Self::new(Arc::new(SrtParser))
    }
}

impl SubtitleIngestor {
    pub fn new(parser: Arc<dyn SubtitleParser>) -> Self {
        Self { parser }
    }

    /// Parse a file payload into entries with ids `1..=N` in file order.
    ///
    /// `None` means no file was supplied at all, which is reported separately
    /// from a file that is present but unparsable.
    pub fn parse(&self, payload: Option<&[u8]>) -> Result<Vec<SubtitleEntry>, SubtitleError> {
        let bytes = payload.ok_or(SubtitleError::MissingInput)?;

        let content = std::str::from_utf8(bytes)
            .map_err(|e| SubtitleError::InvalidEncoding(e.to_string()))?;
        let content = content.strip_prefix('\u{feff}').unwrap_or(content);

        if content.trim().is_empty() {
            warn!("Subtitle file is empty");
            return Ok(Vec::new());
        }

        let cues = self.parser.parse(content)?;

        Ok(cues
            .into_iter()
            .enumerate()
            .map(|(idx, cue)| SubtitleEntry::new(idx as u64 + 1, cue.start_time, cue.end_time, cue.text))
            .collect())
    }
}

/// Render entries back to SubRip text.
///
/// With `use_translation`, each entry's translation is written, falling back
/// to the original text where the translation is empty.
pub fn render_srt(entries: &[SubtitleEntry], use_translation: bool) -> String {
    let mut out = String::new();
    for entry in entries {
        let text = if use_translation && entry.is_translated() {
            &entry.translated_text
        } else {
            &entry.original_text
        };
        out.push_str(&format!("{}\n{} --> {}\n{}\n\n", entry.id, entry.start_time, entry.end_time, text));
    }
    out
}
