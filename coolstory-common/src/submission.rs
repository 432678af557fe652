//! Rules for the story submission form.
//!
//! These checks run before anything is sent to a content backend. Content
//! sanitization and the read time estimate need the parsed markup and live in
//! `coolstory-content`; this module only works on the raw form fields.

use crate::Uri;

pub const WORDS_PER_MINUTE: usize = 200;

pub const TITLE_MAX: usize = 150;

/// Excerpt cap of the demo (fixture) form.
pub const SHORT_EXCERPT_MAX: usize = 200;

/// Excerpt cap of the live CMS form.
pub const LONG_EXCERPT_MAX: usize = 300;

/// `ceil(words / 200)`, never less than a minute.
pub fn read_time_minutes(words: usize) -> u32 {
    let minutes = (words + WORDS_PER_MINUTE - 1) / WORDS_PER_MINUTE;

    std::cmp::max(1, minutes) as u32
}

pub fn word_count(text: &str) -> usize {
    text.split_whitespace().count()
}

/// Cuts `input` to at most `max` characters, on a character boundary.
pub fn clamp_chars(input: &str, max: usize) -> &str {
    match input.char_indices().nth(max) {
        Some((end, _)) => &input[..end],
        None => input,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Limits {
    pub title_max: usize,
    pub excerpt_max: usize,
}

impl Limits {
    pub const SHORT: Limits = Limits {
        title_max: TITLE_MAX,
        excerpt_max: SHORT_EXCERPT_MAX,
    };

    pub const LONG: Limits = Limits {
        title_max: TITLE_MAX,
        excerpt_max: LONG_EXCERPT_MAX,
    };
}

/// The submission form as posted.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct StoryDraft {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub excerpt: String,
    #[serde(default)]
    pub group: String,
    #[serde(default)]
    pub cover_image: String,
}

/// A draft that passed the form rules.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct NewStory {
    pub title: String,
    /// Raw markup, sanitized on insert.
    pub content: String,
    /// Empty when the author left it blank.
    pub excerpt: String,
    pub group_slug: String,
    pub cover_image: Option<String>,
}

#[derive(Debug, PartialEq, Eq, thiserror::Error)]
pub enum Invalid {
    #[error("Please give your story a title.")]
    MissingTitle,
    #[error("Please write your story before sharing it.")]
    MissingContent,
    #[error("Please choose a community for your story.")]
    MissingGroup,
    #[error("That community does not exist.")]
    UnknownGroup,
    #[error("Titles can be at most {0} characters.")]
    TitleTooLong(usize),
    #[error("The cover image must be an http or https link.")]
    CoverImage,
}

impl StoryDraft {
    pub fn validate(&self, limits: Limits) -> Result<NewStory, Invalid> {
        let title = self.title.trim();
        if title.is_empty() {
            return Err(Invalid::MissingTitle);
        }
        if title.chars().count() > limits.title_max {
            return Err(Invalid::TitleTooLong(limits.title_max));
        }

        let content = self.content.trim();
        if content.is_empty() {
            return Err(Invalid::MissingContent);
        }

        let group_slug = self.group.trim();
        if group_slug.is_empty() {
            return Err(Invalid::MissingGroup);
        }

        let cover_image = match self.cover_image.trim() {
            "" => None,
            url => Some(check_image_url(url)?),
        };

        Ok(NewStory {
            title: title.to_string(),
            content: content.to_string(),
            excerpt: clamp_chars(self.excerpt.trim(), limits.excerpt_max).to_string(),
            group_slug: group_slug.to_string(),
            cover_image,
        })
    }
}

fn check_image_url(url: &str) -> Result<String, Invalid> {
    let uri = url.parse::<Uri>().map_err(|_| Invalid::CoverImage)?;

    match (uri.scheme_str(), uri.host()) {
        (Some("http" | "https"), Some(host)) if !host.is_empty() => Ok(url.to_string()),
        _ => Err(Invalid::CoverImage),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn draft() -> StoryDraft {
        StoryDraft {
            title: "The Letter I Never Sent".into(),
            content: "<p>The envelope sits in my desk drawer.</p>".into(),
            excerpt: String::new(),
            group: "love-relationships".into(),
            cover_image: String::new(),
        }
    }

    #[test]
    fn read_time_rounds_up_with_a_floor_of_one() {
        assert_eq!(read_time_minutes(0), 1);
        assert_eq!(read_time_minutes(1), 1);
        assert_eq!(read_time_minutes(200), 1);
        assert_eq!(read_time_minutes(201), 2);
        assert_eq!(read_time_minutes(1000), 5);
    }

    #[test]
    fn words_split_on_any_whitespace() {
        assert_eq!(word_count("  one\ttwo\n\nthree  "), 3);
        assert_eq!(word_count(""), 0);
    }

    #[test]
    fn clamp_respects_character_boundaries() {
        assert_eq!(clamp_chars("héllo", 2), "hé");
        assert_eq!(clamp_chars("short", 200), "short");
        assert_eq!(clamp_chars(&"é".repeat(250), 200).chars().count(), 200);
    }

    #[test]
    fn excerpt_never_exceeds_the_form_cap() {
        let mut long = draft();
        long.excerpt = "x".repeat(450);

        let short = long.validate(Limits::SHORT).unwrap();
        assert_eq!(short.excerpt.chars().count(), SHORT_EXCERPT_MAX);

        let cms = long.validate(Limits::LONG).unwrap();
        assert_eq!(cms.excerpt.chars().count(), LONG_EXCERPT_MAX);
    }

    #[test]
    fn required_fields_are_checked_after_trimming() {
        let mut missing = draft();
        missing.title = "   ".into();
        assert_eq!(missing.validate(Limits::SHORT), Err(Invalid::MissingTitle));

        let mut missing = draft();
        missing.content = "\n".into();
        assert_eq!(missing.validate(Limits::SHORT), Err(Invalid::MissingContent));

        let mut missing = draft();
        missing.group = String::new();
        assert_eq!(missing.validate(Limits::SHORT), Err(Invalid::MissingGroup));
    }

    #[test]
    fn long_titles_are_rejected() {
        let mut draft = draft();
        draft.title = "t".repeat(TITLE_MAX + 1);
        assert_eq!(
            draft.validate(Limits::SHORT),
            Err(Invalid::TitleTooLong(TITLE_MAX))
        );
    }

    #[test]
    fn cover_image_must_be_a_web_url() {
        let mut draft = draft();
        draft.cover_image = "javascript:alert(1)".into();
        assert_eq!(draft.validate(Limits::SHORT), Err(Invalid::CoverImage));

        draft.cover_image = "https://images.unsplash.com/photo-1461749280684?w=800".into();
        let story = draft.validate(Limits::SHORT).unwrap();
        assert_eq!(
            story.cover_image.as_deref(),
            Some("https://images.unsplash.com/photo-1461749280684?w=800")
        );
    }
}
