//! Extract labelled sections from a model reply

use regex::Regex;
use serde::Serialize;
use std::sync::LazyLock;

use crate::prompts::Platform;

/// Any known section label followed by a colon, optionally wrapped in markdown bold
static SECTION_LABEL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"(?:\*\*|##+\s*)?\b(TRANSCRIPT|TITLE|DESCRIPTION|TIMESTAMPS|LINKEDIN POST|TWITTER POST|INSTAGRAM POST|TIKTOK POST|KEYWORDS)(?:\*\*)?:(?:\*\*)?",
    )
    .expect("section label pattern is valid")
});

/// Leading list marker: `-`, `*`, `•` or `1.` / `1)`
static LIST_MARKER: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^(?:[-*•]\s*|\d+[.)]\s+)").expect("list marker pattern is valid")
});

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct YoutubeContent {
    pub transcript: String,
    pub title: String,
    pub description: String,
    pub timestamps: Vec<String>,
}

/// Parsed content for one platform, serialized with camelCase field names
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged, rename_all_fields = "camelCase")]
pub enum GeneratedContent {
    Youtube(YoutubeContent),
    Linkedin { linkedin_post: String },
    Twitter { twitter_post: String },
    Instagram { instagram_post: String },
    Tiktok { tiktok_post: String },
    Keywords { keywords: Vec<String> },
}

impl GeneratedContent {
    /// Post body for the social platforms
    pub fn post(&self) -> Option<&str> {
        match self {
            Self::Linkedin { linkedin_post: p }
            | Self::Twitter { twitter_post: p }
            | Self::Instagram { instagram_post: p }
            | Self::Tiktok { tiktok_post: p } => Some(p),
            Self::Youtube(_) | Self::Keywords { .. } => None,
        }
    }

    /// True when the reply contained none of the expected sections
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Youtube(c) => {
                c.transcript.is_empty()
                    && c.title.is_empty()
                    && c.description.is_empty()
                    && c.timestamps.is_empty()
            }
            Self::Keywords { keywords } => keywords.is_empty(),
            _ => self.post().is_none_or(str::is_empty),
        }
    }
}

/// Split a model reply into the sections expected for `platform`
///
/// Never fails: absent sections come back empty.
pub fn parse_response(platform: Platform, text: &str) -> GeneratedContent {
    let sections = Sections::scan(platform, text);

    match platform {
        Platform::Youtube => GeneratedContent::Youtube(YoutubeContent {
            transcript: sections.get("TRANSCRIPT"),
            title: sections.get("TITLE"),
            description: sections.get("DESCRIPTION"),
            timestamps: sections
                .get("TIMESTAMPS")
                .lines()
                .map(str::trim)
                .filter(|l| !l.is_empty())
                .map(ToString::to_string)
                .collect(),
        }),
        Platform::Linkedin => GeneratedContent::Linkedin {
            linkedin_post: sections.get("LINKEDIN POST"),
        },
        Platform::Twitter => GeneratedContent::Twitter {
            twitter_post: sections.get("TWITTER POST"),
        },
        Platform::Instagram => GeneratedContent::Instagram {
            instagram_post: sections.get("INSTAGRAM POST"),
        },
        Platform::Tiktok => GeneratedContent::Tiktok {
            tiktok_post: sections.get("TIKTOK POST"),
        },
        Platform::Keywords => GeneratedContent::Keywords {
            keywords: parse_keywords(&sections.get("KEYWORDS")),
        },
    }
}

/// One keyword per non-empty line, list markers removed
pub fn parse_keywords(section: &str) -> Vec<String> {
    section
        .lines()
        .map(|line| LIST_MARKER.replace(line.trim(), "").trim().to_string())
        .filter(|k| !k.is_empty())
        .collect()
}

/// Label positions of one platform within a reply
struct Sections<'a> {
    text: &'a str,
    /// (label, body start, match start) in text order
    marks: Vec<(&'a str, usize, usize)>,
}

impl<'a> Sections<'a> {
    fn scan(platform: Platform, text: &'a str) -> Self {
        let labels = platform.section_labels(true);
        let marks = SECTION_LABEL
            .captures_iter(text)
            .filter_map(|caps| {
                let whole = caps.get(0)?;
                let label = caps.get(1)?.as_str();
                labels
                    .contains(&label)
                    .then_some((label, whole.end(), whole.start()))
            })
            .collect();
        Self { text, marks }
    }

    /// Body of the first occurrence of `label`, up to the next label of this platform
    fn get(&self, label: &str) -> String {
        let Some(idx) = self.marks.iter().position(|(l, _, _)| *l == label) else {
            return String::new();
        };
        let start = self.marks[idx].1;
        let end = self
            .marks
            .get(idx + 1)
            .map_or(self.text.len(), |(_, _, next_start)| *next_start);
        self.text[start..end].trim().to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const YOUTUBE_REPLY: &str = "TRANSCRIPT:\nHeute geht es um Testing.\n\nTITLE:\nTesting mit PHPUnit richtig einsetzen\n\nDESCRIPTION:\nErster Absatz.\n\nZweiter Absatz.\n\nTIMESTAMPS:\n0:00 Einstieg\n\n1:10 PHPUnit Setup\n";

    #[test]
    fn test_parse_youtube_sections() {
        let GeneratedContent::Youtube(content) = parse_response(Platform::Youtube, YOUTUBE_REPLY)
        else {
            panic!("expected youtube content");
        };
        assert_eq!(content.transcript, "Heute geht es um Testing.");
        assert_eq!(content.title, "Testing mit PHPUnit richtig einsetzen");
        assert_eq!(content.description, "Erster Absatz.\n\nZweiter Absatz.");
        assert_eq!(content.timestamps, vec!["0:00 Einstieg", "1:10 PHPUnit Setup"]);
    }

    #[test]
    fn test_parse_youtube_missing_sections_are_empty() {
        let content = parse_response(Platform::Youtube, "TITLE: Only a title");
        assert_eq!(
            content,
            GeneratedContent::Youtube(YoutubeContent {
                title: "Only a title".to_string(),
                ..Default::default()
            })
        );
        assert!(parse_response(Platform::Youtube, "no labels at all").is_empty());
    }

    #[test]
    fn test_parse_handles_markdown_bold_labels() {
        let reply = "**TITLE:** Rust im Alltag\n**DESCRIPTION:** Text";
        let GeneratedContent::Youtube(content) = parse_response(Platform::Youtube, reply) else {
            panic!("expected youtube content");
        };
        assert_eq!(content.title, "Rust im Alltag");
        assert_eq!(content.description, "Text");
    }

    #[test]
    fn test_parse_post_platforms() {
        let reply = "Sure, here you go.\n\nLINKEDIN POST:\nIch teste gerne.\n\n#testing #php";
        let content = parse_response(Platform::Linkedin, reply);
        assert_eq!(content.post(), Some("Ich teste gerne.\n\n#testing #php"));

        let content = parse_response(Platform::Tiktok, "TIKTOK POST: kurz und knapp");
        assert_eq!(content.post(), Some("kurz und knapp"));

        assert_eq!(parse_response(Platform::Twitter, "nothing").post(), Some(""));
    }

    #[test]
    fn test_other_platform_labels_do_not_terminate_post() {
        // only this platform's labels delimit sections
        let reply = "INSTAGRAM POST:\nCaption with TITLE: inside";
        let content = parse_response(Platform::Instagram, reply);
        assert_eq!(content.post(), Some("Caption with TITLE: inside"));
    }

    #[test]
    fn test_parse_keywords_strips_markers() {
        let reply = "KEYWORDS:\n- Symfony\n* PHPUnit\n• Docker\n1. Testing\n2) Refactoring\n\n";
        let content = parse_response(Platform::Keywords, reply);
        assert_eq!(
            content,
            GeneratedContent::Keywords {
                keywords: vec![
                    "Symfony".to_string(),
                    "PHPUnit".to_string(),
                    "Docker".to_string(),
                    "Testing".to_string(),
                    "Refactoring".to_string(),
                ]
            }
        );
    }

    #[test]
    fn test_parse_keywords_keeps_leading_version_numbers() {
        let reply = "KEYWORDS:\n2.0 Migration\n3) PHP 8.3\n1.Release\n";
        let content = parse_response(Platform::Keywords, reply);
        assert_eq!(
            content,
            GeneratedContent::Keywords {
                keywords: vec![
                    "2.0 Migration".to_string(),
                    "PHP 8.3".to_string(),
                    "1.Release".to_string(),
                ]
            }
        );
    }

    #[test]
    fn test_serialized_field_names() {
        let json = serde_json::to_value(parse_response(
            Platform::Linkedin,
            "LINKEDIN POST: hallo",
        ))
        .unwrap();
        assert_eq!(json["linkedinPost"], "hallo");

        let json = serde_json::to_value(parse_response(Platform::Youtube, YOUTUBE_REPLY)).unwrap();
        assert_eq!(json["title"], "Testing mit PHPUnit richtig einsetzen");
        assert!(json["timestamps"].is_array());
    }
}
