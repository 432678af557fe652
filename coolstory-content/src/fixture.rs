use std::collections::HashSet;

use chrono::Utc;
use coolstory_common::{
    bail,
    models::{Author, Comment, Group, Story},
    submission::{Invalid, Limits, NewStory},
    Context as _, Report,
};
use coolstory_identity::Tokens;
use tokio::sync::RwLock;

use crate::{ingest, most_liked, newest_first, ContentSource, LikeOutcome, PAGE_SIZE};

const BUNDLED: &str = include_str!("../fixtures/stories.json");

#[derive(serde::Deserialize)]
struct Seed {
    authors: Vec<Author>,
    groups: Vec<Group>,
    stories: Vec<SeedStory>,
    #[serde(default)]
    comments: Vec<Comment>,
}

#[derive(serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct SeedStory {
    #[serde(default)]
    author_id: Option<String>,
    #[serde(flatten)]
    story: Story,
}

/// Serves a fixed data set from memory. Writes only live as long as the
/// process.
pub struct FixtureSource {
    data: RwLock<Data>,
}

struct Data {
    groups: Vec<Group>,
    stories: Vec<Story>,
    /// `(story id, member id)`
    likes: HashSet<(String, String)>,
    /// `(group id, member id)`
    memberships: HashSet<(String, String)>,
}

impl Data {
    fn next_id(&self) -> String {
        let max = self
            .stories
            .iter()
            .filter_map(|story| story.id.parse::<u64>().ok())
            .max()
            .unwrap_or(0);

        (max + 1).to_string()
    }
}

impl FixtureSource {
    pub fn bundled() -> Result<Self, Report> {
        Self::from_json(BUNDLED)
    }

    pub fn from_json(json: &str) -> Result<Self, Report> {
        let Seed {
            authors,
            groups,
            stories,
            ..
        } = serde_json::from_str(json).context("fixture data set is not valid")?;

        let stories = stories
            .into_iter()
            .map(|SeedStory { author_id, mut story }| {
                if story.author.is_none() {
                    story.author = author_id
                        .and_then(|id| authors.iter().find(|author| author.id == id).cloned());
                }

                let prepared = coolstory_markup::prepare(&story.content);
                story.read_time = story.read_time.or_else(|| Some(prepared.read_time()));
                story.content = prepared.html;

                story
            })
            .collect::<Vec<_>>();

        tracing::info!(
            groups = groups.len(),
            stories = stories.len(),
            "loaded fixture data set"
        );

        Ok(Self {
            data: RwLock::new(Data {
                groups,
                stories,
                likes: HashSet::new(),
                memberships: HashSet::new(),
            }),
        })
    }
}

/// Comments shipped with the bundled data set.
pub fn bundled_comments() -> Result<Vec<Comment>, Report> {
    let seed: Seed = serde_json::from_str(BUNDLED).context("fixture data set is not valid")?;

    Ok(seed.comments)
}

#[async_trait::async_trait]
impl ContentSource for FixtureSource {
    fn limits(&self) -> Limits {
        Limits::SHORT
    }

    async fn groups(&self) -> Result<Vec<Group>, Report> {
        Ok(self.data.read().await.groups.clone())
    }

    async fn group_by_slug(&self, slug: &str) -> Result<Option<Group>, Report> {
        let data = self.data.read().await;

        Ok(data.groups.iter().find(|group| group.slug == slug).cloned())
    }

    async fn stories_by_group(&self, slug: &str, limit: usize) -> Result<Vec<Story>, Report> {
        let data = self.data.read().await;

        let stories = data
            .stories
            .iter()
            .filter(|story| story.group_slug == slug)
            .cloned()
            .collect();

        Ok(newest_first(stories, limit))
    }

    async fn story_by_id(&self, id: &str) -> Result<Option<Story>, Report> {
        let data = self.data.read().await;

        Ok(data.stories.iter().find(|story| story.id == id).cloned())
    }

    async fn top_stories(&self, n: usize) -> Result<Vec<Story>, Report> {
        Ok(most_liked(self.data.read().await.stories.clone(), n))
    }

    async fn recent_stories(&self, n: usize) -> Result<Vec<Story>, Report> {
        Ok(newest_first(self.data.read().await.stories.clone(), n))
    }

    async fn featured_story(&self) -> Result<Option<Story>, Report> {
        let data = self.data.read().await;

        Ok(data.stories.iter().find(|story| story.featured).cloned())
    }

    async fn stories_by_author(&self, author_id: &str) -> Result<Vec<Story>, Report> {
        let data = self.data.read().await;

        let stories = data
            .stories
            .iter()
            .filter(|story| matches!(&story.author, Some(author) if author.id == author_id))
            .cloned()
            .collect();

        Ok(newest_first(stories, PAGE_SIZE))
    }

    #[tracing::instrument(skip(self, story, author), fields(author = %author.id), err)]
    async fn insert_story(&self, story: NewStory, author: Author) -> Result<Story, Report> {
        let group = match self.group_by_slug(&story.group_slug).await? {
            Some(group) => group,
            None => return Err(Invalid::UnknownGroup.into()),
        };

        let mut story = ingest(
            String::new(),
            story,
            author,
            &group,
            Utc::now(),
            self.limits(),
        )
        .await?;

        let mut data = self.data.write().await;

        story.id = data.next_id();

        if let Some(group) = data.groups.iter_mut().find(|g| g.slug == group.slug) {
            group.story_count += 1;
        }

        data.stories.push(story.clone());

        tracing::info!(story = %story.id, group = %group.slug, "inserted story");

        Ok(story)
    }

    #[tracing::instrument(skip(self), err)]
    async fn like_story(
        &self,
        story_id: &str,
        member_id: &str,
    ) -> Result<Option<LikeOutcome>, Report> {
        let mut data = self.data.write().await;
        let Data { stories, likes, .. } = &mut *data;

        let story = match stories.iter_mut().find(|story| story.id == story_id) {
            Some(story) => story,
            None => return Ok(None),
        };

        let key = (story_id.to_string(), member_id.to_string());
        let liked = if likes.remove(&key) {
            story.likes_count = story.likes_count.saturating_sub(1);
            false
        } else {
            likes.insert(key);
            story.likes_count += 1;
            true
        };

        Ok(Some(LikeOutcome {
            liked,
            likes_count: story.likes_count,
        }))
    }

    async fn has_liked(&self, story_id: &str, member_id: &str) -> Result<bool, Report> {
        let data = self.data.read().await;

        Ok(data
            .likes
            .contains(&(story_id.to_string(), member_id.to_string())))
    }

    #[tracing::instrument(skip(self, _tokens), err)]
    async fn join_group(
        &self,
        group_id: &str,
        member_id: &str,
        _tokens: &Tokens,
    ) -> Result<(), Report> {
        let mut data = self.data.write().await;
        let Data {
            groups,
            memberships,
            ..
        } = &mut *data;

        let group = match groups.iter_mut().find(|group| group.id == group_id) {
            Some(group) => group,
            None => bail!("no group with id `{}`", group_id),
        };

        if memberships.insert((group_id.to_string(), member_id.to_string())) {
            group.member_count += 1;
        }

        Ok(())
    }

    async fn is_group_member(&self, group_id: &str, member_id: &str) -> Result<bool, Report> {
        let data = self.data.read().await;

        Ok(data
            .memberships
            .contains(&(group_id.to_string(), member_id.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens() -> Tokens {
        Tokens {
            access_token: "demo.m1".into(),
            refresh_token: None,
            expires_at: None,
        }
    }

    fn author() -> Author {
        Author {
            id: "m1".into(),
            nickname: "Guest Storyteller".into(),
            photo: None,
            bio: None,
        }
    }

    fn ids(stories: &[Story]) -> Vec<&str> {
        stories.iter().map(|story| story.id.as_str()).collect()
    }

    #[tokio::test]
    async fn bundled_set_loads_with_authors() {
        let source = FixtureSource::bundled().unwrap();

        assert_eq!(source.groups().await.unwrap().len(), 6);

        let story = source.story_by_id("1").await.unwrap().unwrap();
        assert_eq!(story.author_name(), "Maya Chen");
        assert_eq!(story.read_time, Some(4));
        assert!(story.content.starts_with("<p>"));

        assert_eq!(bundled_comments().unwrap().len(), 2);
    }

    #[tokio::test]
    async fn group_stories_only_match_the_slug() {
        let source = FixtureSource::bundled().unwrap();

        for group in source.groups().await.unwrap() {
            let stories = source.stories_by_group(&group.slug, PAGE_SIZE).await.unwrap();

            assert!(stories.iter().all(|story| story.group_slug == group.slug));
        }

        let family = source.stories_by_group("family-stories", PAGE_SIZE).await.unwrap();
        assert_eq!(ids(&family), ["2", "7"]);

        assert!(source
            .stories_by_group("no-such-group", PAGE_SIZE)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn top_stories_by_likes() {
        let source = FixtureSource::bundled().unwrap();

        let top = source.top_stories(5).await.unwrap();
        assert_eq!(ids(&top), ["8", "6", "7", "4", "2"]);

        assert_eq!(source.top_stories(50).await.unwrap().len(), 8);
        assert!(source.top_stories(0).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn lookups() {
        let source = FixtureSource::bundled().unwrap();

        assert!(source.story_by_id("nope").await.unwrap().is_none());
        assert!(source.group_by_slug("nope").await.unwrap().is_none());
        assert_eq!(
            source.featured_story().await.unwrap().map(|story| story.id),
            Some("1".to_string())
        );

        let recent = source.recent_stories(3).await.unwrap();
        assert_eq!(ids(&recent), ["1", "2", "3"]);

        let by_author = source.stories_by_author("3").await.unwrap();
        assert_eq!(ids(&by_author), ["5", "6"]);
    }

    #[tokio::test]
    async fn inserted_stories_lead_the_feed() {
        let source = FixtureSource::bundled().unwrap();

        let story = source
            .insert_story(
                NewStory {
                    title: "First Snow".into(),
                    content: "It fell overnight.\n\nBy morning the street was new.".into(),
                    excerpt: String::new(),
                    group_slug: "life-lessons".into(),
                    cover_image: None,
                },
                author(),
            )
            .await
            .unwrap();

        assert_eq!(story.id, "9");
        assert_eq!(story.excerpt, "It fell overnight.");
        assert_eq!(story.read_time, Some(1));

        let recent = source.recent_stories(1).await.unwrap();
        assert_eq!(ids(&recent), ["9"]);

        let mine = source.stories_by_author("m1").await.unwrap();
        assert_eq!(ids(&mine), ["9"]);

        let group = source.group_by_slug("life-lessons").await.unwrap().unwrap();
        assert_eq!(group.story_count, 157);
    }

    #[tokio::test]
    async fn reads_proceed_while_a_submission_parses() {
        use std::sync::atomic::{AtomicBool, Ordering};

        let source = FixtureSource::bundled().unwrap();
        let read_done = AtomicBool::new(false);

        let insert = async {
            let story = source
                .insert_story(
                    NewStory {
                        title: "Layers".into(),
                        content: format!("{}deep", "<blockquote>".repeat(3_000)),
                        excerpt: String::new(),
                        group_slug: "life-lessons".into(),
                        cover_image: None,
                    },
                    author(),
                )
                .await
                .unwrap();

            (story, read_done.load(Ordering::SeqCst))
        };

        let read = async {
            let groups = source.groups().await.unwrap();
            read_done.store(true, Ordering::SeqCst);
            groups
        };

        let ((story, read_first), groups) = tokio::join!(insert, read);

        assert!(read_first);
        assert_eq!(groups.len(), 6);
        assert_eq!(story.id, "9");
        assert!(story.content.ends_with("</blockquote>"));
    }

    #[tokio::test]
    async fn insert_into_unknown_group_fails() {
        let source = FixtureSource::bundled().unwrap();

        let err = source
            .insert_story(
                NewStory {
                    title: "Lost".into(),
                    content: "Nowhere to go.".into(),
                    excerpt: String::new(),
                    group_slug: "nowhere".into(),
                    cover_image: None,
                },
                author(),
            )
            .await
            .unwrap_err();

        assert_eq!(err.downcast_ref::<Invalid>(), Some(&Invalid::UnknownGroup));
    }

    #[tokio::test]
    async fn likes_toggle() {
        let source = FixtureSource::bundled().unwrap();

        let liked = source.like_story("1", "m1").await.unwrap().unwrap();
        assert_eq!(liked, LikeOutcome { liked: true, likes_count: 848 });
        assert!(source.has_liked("1", "m1").await.unwrap());

        let unliked = source.like_story("1", "m1").await.unwrap().unwrap();
        assert_eq!(unliked, LikeOutcome { liked: false, likes_count: 847 });
        assert!(!source.has_liked("1", "m1").await.unwrap());

        assert!(source.like_story("nope", "m1").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn joining_counts_once() {
        let source = FixtureSource::bundled().unwrap();

        source.join_group("1", "m1", &tokens()).await.unwrap();
        source.join_group("1", "m1", &tokens()).await.unwrap();

        assert!(source.is_group_member("1", "m1").await.unwrap());
        assert!(!source.is_group_member("2", "m1").await.unwrap());

        let group = source.group_by_slug("life-lessons").await.unwrap().unwrap();
        assert_eq!(group.member_count, 2848);

        assert!(source.join_group("99", "m1", &tokens()).await.is_err());
    }
}
