//! Where stories and groups come from.
//!
//! Pages only see [`ContentSource`]. The fixture backend serves a bundled
//! data set, the CMS backend proxies to the Wix REST API.

pub mod cms;
pub mod comments;
pub mod fixture;

use std::{future::Future, sync::Arc};

use chrono::{DateTime, Utc};
use coolstory_common::{
    models::{Author, Group, Story},
    submission::{clamp_chars, Limits, NewStory, SHORT_EXCERPT_MAX},
    Backend, Conf, Report,
};
use coolstory_identity::Tokens;

pub use cms::CmsSource;
pub use comments::CommentBoard;
pub use fixture::FixtureSource;

/// Stories fetched for one feed or group page.
pub const PAGE_SIZE: usize = 20;

/// State of a story's like after a toggle.
#[derive(Clone, Copy, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LikeOutcome {
    pub liked: bool,
    pub likes_count: u32,
}

#[async_trait::async_trait]
pub trait ContentSource: Send + Sync {
    /// Submission form limits for this backend.
    fn limits(&self) -> Limits;

    async fn groups(&self) -> Result<Vec<Group>, Report>;

    async fn group_by_slug(&self, slug: &str) -> Result<Option<Group>, Report>;

    /// Newest first, only stories filed under `slug`.
    async fn stories_by_group(&self, slug: &str, limit: usize) -> Result<Vec<Story>, Report>;

    /// An unknown id is `None`, not an error.
    async fn story_by_id(&self, id: &str) -> Result<Option<Story>, Report>;

    /// Most liked first, ties in source order.
    async fn top_stories(&self, n: usize) -> Result<Vec<Story>, Report>;

    async fn recent_stories(&self, n: usize) -> Result<Vec<Story>, Report>;

    async fn featured_story(&self) -> Result<Option<Story>, Report>;

    async fn stories_by_author(&self, author_id: &str) -> Result<Vec<Story>, Report>;

    async fn insert_story(&self, story: NewStory, author: Author) -> Result<Story, Report>;

    /// Toggles the member's like. `None` when the story does not exist.
    async fn like_story(
        &self,
        story_id: &str,
        member_id: &str,
    ) -> Result<Option<LikeOutcome>, Report>;

    async fn has_liked(&self, _story_id: &str, _member_id: &str) -> Result<bool, Report> {
        Ok(false)
    }

    async fn join_group(
        &self,
        group_id: &str,
        member_id: &str,
        tokens: &Tokens,
    ) -> Result<(), Report>;

    async fn is_group_member(&self, _group_id: &str, _member_id: &str) -> Result<bool, Report> {
        Ok(false)
    }
}

pub type SharedContent = Arc<dyn ContentSource>;

#[tracing::instrument(skip(conf), err)]
pub fn init_content_source(conf: &Conf) -> Result<SharedContent, Report> {
    let source: SharedContent = match conf.backend()? {
        Backend::Fixture => Arc::new(FixtureSource::bundled()?),
        Backend::Cms => Arc::new(CmsSource::new(&conf.wix()?)?),
    };

    Ok(source)
}

/// Awaits a page level read, logging a failure and standing in an empty
/// result for it.
pub async fn best_effort<T, F>(what: &'static str, fut: F) -> T
where
    T: Default,
    F: Future<Output = Result<T, Report>>,
{
    match fut.await {
        Ok(value) => value,
        Err(err) => {
            tracing::error!(error = ?err, "unable to load {}", what);

            T::default()
        }
    }
}

/// Stable sort by likes, so equal counts keep their order.
pub fn most_liked(mut stories: Vec<Story>, n: usize) -> Vec<Story> {
    stories.sort_by(|a, b| b.likes_count.cmp(&a.likes_count));
    stories.truncate(n);
    stories
}

pub fn newest_first(mut stories: Vec<Story>, n: usize) -> Vec<Story> {
    stories.sort_by(|a, b| b.created_at.cmp(&a.created_at));
    stories.truncate(n);
    stories
}

/// Runs CPU bound work on the blocking pool, inside the caller's span.
pub async fn blocking<T, F>(work: F) -> Result<T, Report>
where
    T: Send + 'static,
    F: FnOnce() -> T + Send + 'static,
{
    let span = tracing::Span::current();

    let out = tokio::task::spawn_blocking(move || span.in_scope(work)).await?;

    Ok(out)
}

/// Builds the stored story from a validated submission: sanitized content,
/// read time and an excerpt when the author left it blank.
///
/// Markup is parsed on the blocking pool.
pub async fn ingest(
    id: String,
    mut new: NewStory,
    author: Author,
    group: &Group,
    created_at: DateTime<Utc>,
    limits: Limits,
) -> Result<Story, Report> {
    let content = std::mem::take(&mut new.content);
    let prepared = blocking(move || coolstory_markup::prepare(&content)).await?;

    let excerpt = if new.excerpt.trim().is_empty() {
        prepared.excerpt(SHORT_EXCERPT_MAX.min(limits.excerpt_max))
    } else {
        clamp_chars(new.excerpt.trim(), limits.excerpt_max).to_string()
    };

    Ok(Story {
        id,
        title: new.title,
        excerpt,
        read_time: Some(prepared.read_time()),
        content: prepared.html,
        cover_image: new.cover_image,
        author: Some(author),
        group_name: group.name.clone(),
        group_slug: group.slug.clone(),
        created_at,
        likes_count: 0,
        comments_count: 0,
        featured: false,
    })
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone as _;
    use coolstory_common::{bail, submission::LONG_EXCERPT_MAX};

    use super::*;

    fn group() -> Group {
        Group {
            id: "1".into(),
            name: "Life Lessons".into(),
            slug: "life-lessons".into(),
            description: String::new(),
            cover_image: None,
            member_count: 0,
            story_count: 0,
            icon: None,
        }
    }

    fn author() -> Author {
        Author {
            id: "m1".into(),
            nickname: "Maya Chen".into(),
            photo: None,
            bio: None,
        }
    }

    fn new_story(content: &str, excerpt: &str) -> NewStory {
        NewStory {
            title: "A title".into(),
            content: content.into(),
            excerpt: excerpt.into(),
            group_slug: "life-lessons".into(),
            cover_image: None,
        }
    }

    #[tokio::test]
    async fn ingest_sanitizes_and_times() {
        let content = format!(
            "<p>{}</p><script>alert(1)</script>",
            vec!["word"; 401].join(" ")
        );

        let story = ingest(
            "9".into(),
            new_story(&content, ""),
            author(),
            &group(),
            Utc::now(),
            Limits::SHORT,
        )
        .await
        .unwrap();

        assert!(!story.content.contains("script"));
        assert_eq!(story.read_time, Some(3));
        assert!(story.excerpt.chars().count() <= SHORT_EXCERPT_MAX);
        assert_eq!(story.group_name, "Life Lessons");
        assert_eq!(story.likes_count, 0);
    }

    #[tokio::test]
    async fn ingest_clamps_given_excerpt() {
        let long = "x".repeat(500);

        let story = ingest(
            "9".into(),
            new_story("short", &long),
            author(),
            &group(),
            Utc::now(),
            Limits::LONG,
        )
        .await
        .unwrap();

        assert_eq!(story.excerpt.chars().count(), LONG_EXCERPT_MAX);
        assert_eq!(story.read_time, Some(1));
    }

    fn story(id: &str, likes: u32, day: u32) -> Story {
        Story {
            id: id.into(),
            title: id.into(),
            excerpt: String::new(),
            content: String::new(),
            cover_image: None,
            author: None,
            group_name: String::new(),
            group_slug: String::new(),
            created_at: Utc.with_ymd_and_hms(2024, 1, day, 0, 0, 0).unwrap(),
            likes_count: likes,
            comments_count: 0,
            read_time: None,
            featured: false,
        }
    }

    #[test]
    fn most_liked_keeps_ties_in_order() {
        let stories = vec![story("a", 5, 1), story("b", 9, 2), story("c", 5, 3)];

        let ids = most_liked(stories, 3)
            .into_iter()
            .map(|story| story.id)
            .collect::<Vec<_>>();

        assert_eq!(ids, ["b", "a", "c"]);
    }

    #[test]
    fn newest_first_truncates() {
        let stories = vec![story("a", 0, 1), story("b", 0, 3), story("c", 0, 2)];

        let ids = newest_first(stories, 2)
            .into_iter()
            .map(|story| story.id)
            .collect::<Vec<_>>();

        assert_eq!(ids, ["b", "c"]);
    }

    #[tokio::test]
    async fn blocking_work_runs_off_the_runtime() {
        let caller = std::thread::current().id();

        let worker = blocking(|| std::thread::current().id()).await.unwrap();
        assert_ne!(worker, caller);

        let prepared = blocking(|| coolstory_markup::prepare(&"<blockquote>".repeat(2_000)))
            .await
            .unwrap();
        assert!(prepared.html.starts_with("<blockquote><blockquote>"));
    }

    #[tokio::test]
    async fn best_effort_swallows_errors() {
        async fn failing() -> Result<Vec<Story>, Report> {
            bail!("backend down")
        }

        let stories = best_effort("stories", failing()).await;
        assert!(stories.is_empty());

        let found: Option<u32> = best_effort("value", async { Ok(Some(3)) }).await;
        assert_eq!(found, Some(3));
    }
}
