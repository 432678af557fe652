use askama::Template;
use axum::{
    http::StatusCode,
    response::{Html, IntoResponse, Response},
};
use coolstory_common::{
    models::{Comment, Group, Member, Story},
    submission::{Limits, StoryDraft},
};
use coolstory_identity::Session;

use crate::Error;

pub static STYLE: &str = include_str!("../../assets/site.css");
pub static FEED_SCRIPT: &str = include_str!("../../assets/feed.js");

pub fn render<T>(page: T) -> Result<Html<String>, Error>
where
    T: Template,
{
    Ok(Html(page.render().map_err(Error::from_any)?))
}

pub fn render_with_status<T>(status: StatusCode, page: T) -> Result<Response, Error>
where
    T: Template,
{
    Ok((status, render(page)?).into_response())
}

/// What every page shares: the stylesheet, the title and who is signed in.
pub struct Layout {
    pub css: &'static str,
    pub title: String,
    pub member: Option<Member>,
    pub year: i32,
}

impl Layout {
    pub fn new(title: impl Into<String>, session: &Session) -> Self {
        use chrono::Datelike as _;

        Self {
            css: STYLE,
            title: title.into(),
            member: session.member.clone(),
            year: chrono::Utc::now().year(),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CardVariant {
    Default,
    Featured,
    Compact,
    Minimal,
}

pub struct Card {
    pub story: Story,
    pub variant: CardVariant,
}

impl Card {
    pub fn new(story: Story, variant: CardVariant) -> Self {
        Self { story, variant }
    }

    pub fn list(stories: Vec<Story>, variant: CardVariant) -> Vec<Self> {
        stories
            .into_iter()
            .map(|story| Self::new(story, variant))
            .collect()
    }

    pub fn href(&self) -> String {
        format!("/stories/{}", self.story.id)
    }

    pub fn is_featured(&self) -> bool {
        self.variant == CardVariant::Featured
    }

    pub fn is_compact(&self) -> bool {
        self.variant == CardVariant::Compact
    }

    pub fn is_minimal(&self) -> bool {
        self.variant == CardVariant::Minimal
    }
}

#[derive(askama::Template)]
#[template(path = "index.html")]
pub struct IndexPage {
    pub layout: Layout,
    pub groups: Vec<Group>,
    pub selected: Option<String>,
    pub featured: Option<Card>,
    pub cards: Vec<Card>,
    pub loved: Vec<Card>,
    pub script: &'static str,
}

impl IndexPage {
    pub fn is_selected(&self, slug: &str) -> bool {
        self.selected.as_deref() == Some(slug)
    }
}

/// The feed section alone, swapped in by the feed script.
#[derive(askama::Template)]
#[template(path = "feed.html")]
pub struct FeedFragment {
    pub featured: Option<Card>,
    pub cards: Vec<Card>,
}

#[derive(askama::Template)]
#[template(path = "groups.html")]
pub struct GroupsPage {
    pub layout: Layout,
    pub groups: Vec<Group>,
    pub query: String,
}

#[derive(askama::Template)]
#[template(path = "group.html")]
pub struct GroupPage {
    pub layout: Layout,
    pub group: Group,
    pub cards: Vec<Card>,
    pub is_member: bool,
}

#[derive(askama::Template)]
#[template(path = "story.html")]
pub struct StoryPage {
    pub layout: Layout,
    pub story: Story,
    pub liked: bool,
    pub comments: Vec<Comment>,
    pub more: Vec<Card>,
}

#[derive(askama::Template)]
#[template(path = "new_story.html")]
pub struct NewStoryPage {
    pub layout: Layout,
    pub groups: Vec<Group>,
    pub draft: StoryDraft,
    pub error: Option<String>,
    pub limits: Limits,
}

impl NewStoryPage {
    pub fn is_chosen(&self, slug: &str) -> bool {
        self.draft.group == slug
    }
}

#[derive(askama::Template)]
#[template(path = "profile.html")]
pub struct ProfilePage {
    pub layout: Layout,
    pub member: Member,
    pub cards: Vec<Card>,
}

#[derive(askama::Template)]
#[template(path = "about.html")]
pub struct AboutPage {
    pub layout: Layout,
}

#[derive(askama::Template)]
#[template(path = "not_found.html")]
pub struct NotFoundPage {
    pub layout: Layout,
    pub message: &'static str,
}

pub fn not_found(session: &Session, message: &'static str) -> Result<Response, Error> {
    render_with_status(
        StatusCode::NOT_FOUND,
        NotFoundPage {
            layout: Layout::new(message, session),
            message,
        },
    )
}

mod filters {
    use crate::readable::IntoReadable as _;

    pub fn readable<N>(n: N) -> askama::Result<String>
    where
        N: std::fmt::Display,
    {
        Ok(n.into_readable().to_string())
    }
}
