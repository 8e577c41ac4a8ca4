//! Transcript cleanup and request input validation

use thiserror::Error;
use tracing::debug;

/// Longest transcript accepted, in characters
pub const MAX_TRANSCRIPT_CHARS: usize = 50_000;

/// Invalid user input; maps to a 400 at the HTTP layer
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum InputError {
    #[error("Transkript fehlt oder ist leer")]
    EmptyTranscript,
    #[error("Transkript zu lang: {chars} Zeichen (maximal {max})")]
    TranscriptTooLong { chars: usize, max: usize },
    #[error("Ungültige Video-Dauer '{0}', erwartet m:ss oder h:mm:ss")]
    InvalidVideoDuration(String),
    #[error("Ungültiger Typ '{0}'")]
    UnknownPlatform(String),
}

/// Transcript ready to embed in a prompt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PreparedTranscript {
    pub text: String,
    /// A stray trailing single-character word was removed
    pub cleaned: bool,
}

/// Validate a raw transcript and strip a trailing one-character word
///
/// Speech-to-text output frequently ends with a lone stray character. When the
/// last whitespace-separated word has exactly one character it is dropped and
/// the remaining words are re-joined with single spaces.
pub fn prepare_transcript(raw: &str) -> Result<PreparedTranscript, InputError> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return Err(InputError::EmptyTranscript);
    }

    let chars = trimmed.chars().count();
    if chars > MAX_TRANSCRIPT_CHARS {
        return Err(InputError::TranscriptTooLong {
            chars,
            max: MAX_TRANSCRIPT_CHARS,
        });
    }

    let mut words: Vec<&str> = trimmed.split_whitespace().collect();
    let stray_tail = words
        .last()
        .is_some_and(|last| last.chars().count() == 1);

    if !stray_tail {
        return Ok(PreparedTranscript {
            text: trimmed.to_string(),
            cleaned: false,
        });
    }

    words.pop();
    debug!("Removed trailing single-character word from transcript");
    let text = words.join(" ");
    if text.is_empty() {
        return Err(InputError::EmptyTranscript);
    }

    Ok(PreparedTranscript {
        text,
        cleaned: true,
    })
}

/// Accept `m:ss`, `mm:ss` or `h:mm:ss`
pub fn validate_video_duration(duration: &str) -> Result<(), InputError> {
    let invalid = || InputError::InvalidVideoDuration(duration.to_string());
    let parts: Vec<&str> = duration.trim().split(':').collect();

    let (lead, rest) = match parts.as_slice() {
        [minutes, seconds] => (*minutes, vec![*seconds]),
        [hours, minutes, seconds] => (*hours, vec![*minutes, *seconds]),
        _ => return Err(invalid()),
    };

    if lead.is_empty() || lead.len() > 2 || !lead.bytes().all(|b| b.is_ascii_digit()) {
        return Err(invalid());
    }
    if parts.len() == 3 && lead.len() != 1 {
        return Err(invalid());
    }

    for part in rest {
        let two_digits = part.len() == 2 && part.bytes().all(|b| b.is_ascii_digit());
        if !two_digits || part > "59" {
            return Err(invalid());
        }
    }

    Ok(())
}

/// Treat a blank duration as absent, validate anything else
///
/// Returns the trimmed duration when one was supplied.
pub fn normalize_video_duration(duration: Option<&str>) -> Result<Option<String>, InputError> {
    match duration.map(str::trim).filter(|d| !d.is_empty()) {
        Some(d) => {
            validate_video_duration(d)?;
            Ok(Some(d.to_string()))
        }
        None => Ok(None),
    }
}
