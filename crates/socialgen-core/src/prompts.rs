//! Prompt construction per target platform

use std::fmt;
use std::str::FromStr;

use crate::transcript::InputError;

/// Kind of content to generate from a transcript
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Platform {
    #[default]
    Youtube,
    Linkedin,
    Twitter,
    Instagram,
    Tiktok,
    Keywords,
}

impl Platform {
    pub const ALL: [Platform; 6] = [
        Platform::Youtube,
        Platform::Linkedin,
        Platform::Twitter,
        Platform::Instagram,
        Platform::Tiktok,
        Platform::Keywords,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Platform::Youtube => "youtube",
            Platform::Linkedin => "linkedin",
            Platform::Twitter => "twitter",
            Platform::Instagram => "instagram",
            Platform::Tiktok => "tiktok",
            Platform::Keywords => "keywords",
        }
    }

    /// Output section labels the model is asked to emit, in order
    ///
    /// YouTube only includes `TIMESTAMPS` when a video duration was given.
    pub fn section_labels(&self, with_timestamps: bool) -> Vec<&'static str> {
        match self {
            Platform::Youtube if with_timestamps => {
                vec!["TRANSCRIPT", "TITLE", "DESCRIPTION", "TIMESTAMPS"]
            }
            Platform::Youtube => vec!["TRANSCRIPT", "TITLE", "DESCRIPTION"],
            Platform::Linkedin => vec!["LINKEDIN POST"],
            Platform::Twitter => vec!["TWITTER POST"],
            Platform::Instagram => vec!["INSTAGRAM POST"],
            Platform::Tiktok => vec!["TIKTOK POST"],
            Platform::Keywords => vec!["KEYWORDS"],
        }
    }

    fn task(&self) -> &'static str {
        match self {
            Platform::Youtube => {
                "You optimize YouTube Shorts content for a developer audience. \
                 Return the transcript with corrected punctuation only, an SEO title \
                 of 60-70 characters that starts with the main keyword, and a \
                 description of three paragraphs based strictly on the transcript."
            }
            Platform::Linkedin => {
                "Turn the transcript into an informative LinkedIn post of 1000-1500 \
                 characters with short paragraphs, at most one emoji per paragraph, \
                 a closing question for readers and 3-5 hashtags."
            }
            Platform::Twitter => {
                "Turn the transcript into a single post for X/Twitter of at most 280 \
                 characters with one or two relevant hashtags."
            }
            Platform::Instagram => {
                "Turn the transcript into an Instagram caption of at most 2200 \
                 characters with a strong first line and 5-10 hashtags at the end."
            }
            Platform::Tiktok => {
                "Turn the transcript into a short TikTok caption with a hook in the \
                 first sentence and 3-5 hashtags."
            }
            Platform::Keywords => {
                "Extract the three most relevant technical keywords that literally \
                 occur in the transcript. Skip channel names, calls to action and \
                 generic words. Return one keyword per line."
            }
        }
    }
}

impl fmt::Display for Platform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Platform {
    type Err = InputError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim();
        Platform::ALL
            .into_iter()
            .find(|p| p.as_str().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| InputError::UnknownPlatform(s.to_string()))
    }
}

/// Optional inputs that shape a prompt
#[derive(Debug, Clone, Default)]
pub struct PromptOptions {
    /// Video length (`m:ss` or `h:mm:ss`); enables YouTube timestamps
    pub video_duration: Option<String>,
    /// Keywords the output should feature prominently
    pub keywords: Vec<String>,
}

impl PromptOptions {
    fn duration(&self) -> Option<&str> {
        self.video_duration
            .as_deref()
            .map(str::trim)
            .filter(|d| !d.is_empty())
    }
}

/// Assemble the full prompt for `platform`
pub fn build_prompt(platform: Platform, transcript: &str, options: &PromptOptions) -> String {
    let duration = options.duration().filter(|_| platform == Platform::Youtube);
    let mut prompt = String::with_capacity(transcript.len() + 1024);

    prompt.push_str(platform.task());
    prompt.push_str("\n\nTranscript:\n");
    prompt.push_str(transcript);

    let keywords: Vec<&str> = options
        .keywords
        .iter()
        .map(|k| k.trim())
        .filter(|k| !k.is_empty())
        .collect();
    if !keywords.is_empty() && platform != Platform::Keywords {
        prompt.push_str("\n\nPriority keywords, use them prominently: ");
        prompt.push_str(&keywords.join(", "));
    }

    if let Some(duration) = duration {
        prompt.push_str(&format!(
            "\n\nAlso create 5 timestamps spread evenly over {duration}, one per line \
             in the form \"0:00 Topic\", each topic taken from the transcript."
        ));
    }

    prompt.push_str("\n\nFormat your answer exactly like this:\n");
    for label in platform.section_labels(duration.is_some()) {
        prompt.push_str(&format!("\n{label}:\n{}\n", placeholder(label)));
    }

    prompt
}

fn placeholder(label: &str) -> &'static str {
    match label {
        "TRANSCRIPT" => "[transcript with corrected punctuation]",
        "TITLE" => "[title]",
        "DESCRIPTION" => "[description]",
        "TIMESTAMPS" => "[one timestamp per line]",
        "KEYWORDS" => "keyword1\nkeyword2\nkeyword3",
        _ => "[post text]",
    }
}
