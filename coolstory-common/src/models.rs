use chrono::{DateTime, Utc};

/// Read time shown when a story carries neither a stored estimate nor content.
pub const DEFAULT_READ_TIME: u32 = 3;

pub const ANONYMOUS: &str = "Anonymous";

#[derive(Clone, Debug, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
pub struct Author {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub photo: Option<String>,
    #[serde(default)]
    pub bio: Option<String>,
}

impl Author {
    pub fn display_name(&self) -> &str {
        if self.nickname.trim().is_empty() {
            ANONYMOUS
        } else {
            self.nickname.as_str()
        }
    }

    pub fn initial(&self) -> char {
        self.display_name().chars().next().unwrap_or('A')
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Story {
    #[serde(rename = "_id")]
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub excerpt: String,
    /// Sanitized HTML.
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub author: Option<Author>,
    #[serde(default)]
    pub group_name: String,
    #[serde(default)]
    pub group_slug: String,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub likes_count: u32,
    #[serde(default)]
    pub comments_count: u32,
    #[serde(default)]
    pub read_time: Option<u32>,
    #[serde(default)]
    pub featured: bool,
}

impl Story {
    pub fn author_name(&self) -> &str {
        self.author
            .as_ref()
            .map(Author::display_name)
            .unwrap_or(ANONYMOUS)
    }

    pub fn author_initial(&self) -> char {
        self.author.as_ref().map(Author::initial).unwrap_or('A')
    }

    pub fn author_photo(&self) -> Option<&str> {
        self.author.as_ref().and_then(|author| author.photo.as_deref())
    }

    pub fn read_minutes(&self) -> u32 {
        self.read_time.unwrap_or(DEFAULT_READ_TIME)
    }

    /// `Jan 15, 2024`
    pub fn published_on(&self) -> String {
        self.created_at.format("%b %-d, %Y").to_string()
    }

    /// `January 15, 2024`
    pub fn published_on_long(&self) -> String {
        self.created_at.format("%B %-d, %Y").to_string()
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub cover_image: Option<String>,
    #[serde(default)]
    pub member_count: u32,
    #[serde(default)]
    pub story_count: u32,
    #[serde(default)]
    pub icon: Option<String>,
}

impl Group {
    pub fn icon(&self) -> &str {
        match &self.icon {
            Some(icon) if !icon.is_empty() => icon.as_str(),
            _ => icon_for(&self.name),
        }
    }
}

/// Picks an emoji for a group from keywords in its name.
pub fn icon_for(name: &str) -> &'static str {
    static ICONS: &[(&str, &str)] = &[
        ("tech", "💻"),
        ("life", "🌱"),
        ("travel", "✈️"),
        ("art", "🎨"),
        ("music", "🎵"),
        ("sports", "⚽"),
        ("food", "🍳"),
        ("books", "📚"),
        ("business", "💼"),
        ("health", "💪"),
    ];

    let name = name.to_lowercase();

    ICONS
        .iter()
        .find(|(keyword, _)| name.contains(keyword))
        .map(|(_, icon)| *icon)
        .unwrap_or("📖")
}

/// The signed in user, as reported by the identity provider.
#[derive(Clone, Debug, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Member {
    #[serde(rename = "_id")]
    pub id: String,
    #[serde(default)]
    pub login_email: Option<String>,
    #[serde(default)]
    pub nickname: Option<String>,
    #[serde(default)]
    pub photo: Option<String>,
}

impl Member {
    pub fn display_name(&self) -> &str {
        self.nickname
            .as_deref()
            .filter(|nickname| !nickname.trim().is_empty())
            .unwrap_or(ANONYMOUS)
    }

    pub fn as_author(&self) -> Author {
        Author {
            id: self.id.clone(),
            nickname: self.display_name().to_string(),
            photo: self.photo.clone(),
            bio: None,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
#[derive(serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Comment {
    #[serde(rename = "_id")]
    pub id: String,
    pub story_id: String,
    /// Plain text, escaped at render time.
    pub content: String,
    pub author: Author,
    pub created_at: DateTime<Utc>,
    #[serde(default)]
    pub likes_count: u32,
}

impl Comment {
    pub fn posted_on(&self) -> String {
        self.created_at.format("%b %-d, %Y").to_string()
    }
}
