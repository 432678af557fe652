//! Wix REST adapter.
//!
//! Stories live in the `Stories` data collection, groups come from Social
//! Groups. Server side calls authenticate with the site's API key; joining a
//! group acts as the member and uses their access token.

use std::{
    collections::{HashMap, HashSet},
    sync::Arc,
};

use chrono::{DateTime, Utc};
use coolstory_common::{
    models::{Author, Group, Story},
    submission::{clamp_chars, Invalid, Limits, NewStory, LONG_EXCERPT_MAX, SHORT_EXCERPT_MAX},
    utils::{self, join_uri, send_json, send_json_optional},
    Report, WixCredentials,
};
use coolstory_identity::{wix::MemberResponse, Tokens};
use dataloader::{cached::Loader, BatchFn};
use futures::stream::{self, StreamExt as _};
use isahc::{http::Method, HttpClient};
use serde_json::{json, Value};
use tokio::sync::{Mutex, OwnedMutexGuard, RwLock};

use crate::{blocking, ingest, most_liked, ContentSource, LikeOutcome, PAGE_SIZE};

const STORIES: &str = "Stories";

const ITEMS_PATH: &str = "/wix-data/v2/items";
const ITEMS_QUERY_PATH: &str = "/wix-data/v2/items/query";
const GROUPS_PATH: &str = "/social-groups/v2/groups";
const GROUPS_QUERY_PATH: &str = "/social-groups/v2/groups/query";
const MEMBERS_PATH: &str = "/members/v1/members";

/// Largest page the groups query is asked for.
const GROUPS_LIMIT: usize = 100;

/// Member profiles fetched at once by one batch.
const MEMBER_FETCHES: usize = 8;

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct QueryResponse<T> {
    #[serde(default = "Vec::new")]
    data_items: Vec<DataItem<T>>,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct ItemResponse<T> {
    data_item: DataItem<T>,
}

#[derive(Debug, serde::Deserialize)]
struct DataItem<T> {
    #[serde(default)]
    id: Option<String>,
    data: T,
}

/// Wix sends dates either as plain strings or wrapped as `{"$date": ...}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Deserialize)]
#[serde(untagged)]
enum WixDate {
    Wrapped {
        #[serde(rename = "$date")]
        date: DateTime<Utc>,
    },
    Plain(DateTime<Utc>),
}

impl WixDate {
    fn into_inner(self) -> DateTime<Utc> {
        match self {
            WixDate::Wrapped { date } | WixDate::Plain(date) => date,
        }
    }
}

/// Stories either embed their author or reference a member by id.
#[derive(Debug, Clone, serde::Deserialize)]
#[serde(untagged)]
enum AuthorField {
    Embedded(Author),
    Reference(String),
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct StoryRecord {
    #[serde(rename = "_id", default)]
    id: Option<String>,
    #[serde(default)]
    title: String,
    #[serde(default)]
    excerpt: String,
    #[serde(default)]
    content: String,
    #[serde(default)]
    cover_image: Option<String>,
    #[serde(default)]
    author: Option<AuthorField>,
    #[serde(default)]
    group_name: String,
    #[serde(default)]
    group_slug: String,
    #[serde(rename = "_createdDate", default)]
    created_date: Option<WixDate>,
    #[serde(default)]
    likes_count: Option<f64>,
    #[serde(default)]
    comments_count: Option<f64>,
    #[serde(default)]
    read_time: Option<f64>,
    #[serde(default)]
    featured: Option<bool>,
}

impl StoryRecord {
    fn author_reference(&self) -> Option<&str> {
        match &self.author {
            Some(AuthorField::Reference(id)) if !id.is_empty() => Some(id.as_str()),
            _ => None,
        }
    }

    fn into_story(
        self,
        item_id: Option<String>,
        members: &HashMap<String, Option<Author>>,
    ) -> Story {
        let prepared = coolstory_markup::prepare(&self.content);

        let author = match self.author {
            Some(AuthorField::Embedded(author)) => Some(author),
            Some(AuthorField::Reference(id)) => members.get(&id).cloned().flatten(),
            None => None,
        };

        let excerpt = if self.excerpt.trim().is_empty() {
            prepared.excerpt(SHORT_EXCERPT_MAX)
        } else {
            clamp_chars(self.excerpt.trim(), LONG_EXCERPT_MAX).to_string()
        };

        let read_time = match self.read_time {
            Some(minutes) if minutes >= 1.0 => Some(count(Some(minutes))),
            _ if prepared.words > 0 => Some(prepared.read_time()),
            _ => None,
        };

        Story {
            id: self.id.or(item_id).unwrap_or_default(),
            title: self.title,
            excerpt,
            content: prepared.html,
            cover_image: self.cover_image.filter(|url| is_web_url(url)),
            author,
            group_name: self.group_name,
            group_slug: self.group_slug,
            created_at: self
                .created_date
                .map(WixDate::into_inner)
                .unwrap_or_default(),
            likes_count: count(self.likes_count),
            comments_count: count(self.comments_count),
            read_time,
            featured: self.featured.unwrap_or(false),
        }
    }
}

#[derive(Debug, serde::Deserialize)]
struct GroupsResponse {
    #[serde(default)]
    groups: Vec<GroupRecord>,
}

#[derive(Debug, serde::Deserialize)]
struct GroupResponse {
    group: GroupRecord,
}

#[derive(Debug, serde::Deserialize)]
#[serde(rename_all = "camelCase")]
struct GroupRecord {
    #[serde(alias = "_id")]
    id: String,
    name: String,
    slug: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    cover_image: Option<CoverImage>,
    #[serde(default)]
    members_count: Option<u32>,
    #[serde(default)]
    posts_count: Option<u32>,
}

#[derive(Debug, serde::Deserialize)]
struct CoverImage {
    #[serde(default)]
    url: Option<String>,
}

impl From<GroupRecord> for Group {
    fn from(record: GroupRecord) -> Self {
        Group {
            id: record.id,
            name: record.name,
            slug: record.slug,
            description: record.description.unwrap_or_default(),
            cover_image: record
                .cover_image
                .and_then(|cover| cover.url)
                .filter(|url| is_web_url(url)),
            member_count: record.members_count.unwrap_or(0),
            story_count: record.posts_count.unwrap_or(0),
            icon: None,
        }
    }
}

fn count(value: Option<f64>) -> u32 {
    match value {
        Some(value) if value.is_finite() && value > 0.0 => value.round() as u32,
        _ => 0,
    }
}

fn is_web_url(url: &str) -> bool {
    url.starts_with("https://") || url.starts_with("http://")
}

/// Body of a `Stories` collection query, sorted descending on `sort_by`.
fn story_query(filter: Option<Value>, sort_by: &str, limit: usize) -> Value {
    let mut query = json!({
        "sort": [{ "fieldName": sort_by, "order": "DESC" }],
        "paging": { "limit": limit },
    });

    if let Some(filter) = filter {
        query["filter"] = filter;
    }

    json!({
        "dataCollectionId": STORIES,
        "query": query,
    })
}

/// The collection fields written for a new story.
fn story_data(story: &Story) -> Value {
    json!({
        "title": story.title,
        "excerpt": story.excerpt,
        "content": story.content,
        "coverImage": story.cover_image,
        "author": story.author,
        "groupName": story.group_name,
        "groupSlug": story.group_slug,
        "likesCount": story.likes_count,
        "commentsCount": story.comments_count,
        "readTime": story.read_time,
        "featured": story.featured,
    })
}

struct Api {
    client: HttpClient,
    api_key: String,
    site_id: String,
    api_base: String,
}

impl Api {
    fn headers(&self) -> [(&str, &str); 2] {
        [
            ("Authorization", self.api_key.as_str()),
            ("wix-site-id", self.site_id.as_str()),
        ]
    }

    async fn send<T>(&self, method: Method, path: &str, body: Option<&Value>) -> Result<T, Report>
    where
        T: serde::de::DeserializeOwned,
    {
        let uri = join_uri(&self.api_base, path)?;

        send_json(&self.client, method, &uri, &self.headers(), body).await
    }

    async fn send_optional<T>(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<Option<T>, Report>
    where
        T: serde::de::DeserializeOwned,
    {
        let uri = join_uri(&self.api_base, path)?;

        send_json_optional(&self.client, method, &uri, &self.headers(), body).await
    }

    #[tracing::instrument(skip(self), err)]
    async fn member(&self, id: &str) -> Result<Option<Author>, Report> {
        let path = format!(
            "{}/{}?fieldsets=PUBLIC",
            MEMBERS_PATH,
            urlencoding::encode(id)
        );

        let res: Option<MemberResponse> = self.send_optional(Method::GET, &path, None).await?;

        Ok(res.map(|res| {
            let profile = res.member.profile.unwrap_or_default();

            Author {
                id: res.member.id,
                nickname: profile.nickname.unwrap_or_default(),
                photo: profile.photo.and_then(|photo| photo.url),
                bio: None,
            }
        }))
    }
}

struct MemberLoader {
    api: Arc<Api>,
}

#[async_trait::async_trait]
impl BatchFn<String, Option<Author>> for MemberLoader {
    #[tracing::instrument(skip(self))]
    async fn load(&mut self, keys: &[String]) -> HashMap<String, Option<Author>> {
        stream::iter(keys.iter().cloned())
            .map(|key| {
                let api = Arc::clone(&self.api);

                async move {
                    let author = match api.member(&key).await {
                        Ok(author) => author,
                        Err(err) => {
                            tracing::error!(err = ?err, "unable to load member");

                            None
                        }
                    };

                    (key, author)
                }
            })
            .buffer_unordered(MEMBER_FETCHES)
            .collect::<HashMap<_, _>>()
            .await
    }
}

/// One lock per story, so concurrent likes on a story read and write its
/// count in turn.
#[derive(Default)]
struct StoryLocks {
    held: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl StoryLocks {
    async fn acquire(&self, story_id: &str) -> OwnedMutexGuard<()> {
        let lock = {
            let mut held = self.held.lock().await;

            Arc::clone(held.entry(story_id.to_string()).or_default())
        };

        lock.lock_owned().await
    }

    /// Unlocks the story, forgetting it once nobody else waits on it.
    async fn release(&self, story_id: &str, guard: OwnedMutexGuard<()>) {
        let mut held = self.held.lock().await;

        drop(guard);

        if matches!(held.get(story_id), Some(lock) if Arc::strong_count(lock) == 1) {
            held.remove(story_id);
        }
    }
}

/// Reads and writes the site's content through the Wix REST API.
pub struct CmsSource {
    api: Arc<Api>,
    /// Authors referenced by id, cached for the life of the process.
    members: Loader<String, Option<Author>, MemberLoader>,
    story_locks: StoryLocks,
    /// `(story id, member id)`, likes given through this process.
    likes: RwLock<HashSet<(String, String)>>,
    /// `(group id, member id)`, joins made through this process.
    memberships: RwLock<HashSet<(String, String)>>,
}

impl CmsSource {
    pub fn new(credentials: &WixCredentials) -> Result<Self, Report> {
        let api = Arc::new(Api {
            client: utils::client()?,
            api_key: credentials.api_key.clone(),
            site_id: credentials.site_id.clone(),
            api_base: credentials.api_base.clone(),
        });

        Ok(Self {
            members: Loader::new(MemberLoader {
                api: Arc::clone(&api),
            }),
            api,
            story_locks: StoryLocks::default(),
            likes: RwLock::new(HashSet::new()),
            memberships: RwLock::new(HashSet::new()),
        })
    }

    /// Turns collection items into stories, loading referenced authors in
    /// one batch. Content is sanitized on the blocking pool.
    async fn resolve(&self, items: Vec<DataItem<StoryRecord>>) -> Result<Vec<Story>, Report> {
        let ids = items
            .iter()
            .filter_map(|item| item.data.author_reference())
            .map(str::to_string)
            .collect::<HashSet<_>>()
            .into_iter()
            .collect::<Vec<_>>();

        let members = if ids.is_empty() {
            HashMap::new()
        } else {
            self.load_members(ids).await
        };

        blocking(move || {
            items
                .into_iter()
                .map(|item| item.data.into_story(item.id, &members))
                .collect()
        })
        .await
    }

    async fn load_members(&self, ids: Vec<String>) -> HashMap<String, Option<Author>> {
        let members = match self.members.try_load_many(ids).await {
            Ok(members) => members,
            Err(err) => {
                tracing::error!(error = ?err, "unable to load members");

                return HashMap::new();
            }
        };

        // misses are asked for again next time
        for (id, author) in &members {
            if author.is_none() {
                self.members.clear(id.clone()).await;
            }
        }

        members
    }

    #[tracing::instrument(skip(self, body), err)]
    async fn query_stories(&self, body: Value) -> Result<Vec<Story>, Report> {
        let res: QueryResponse<StoryRecord> = self
            .api
            .send(Method::POST, ITEMS_QUERY_PATH, Some(&body))
            .await?;

        tracing::debug!(count = res.data_items.len(), "queried stories");

        self.resolve(res.data_items).await
    }

    /// Flips the member's like and writes the new count back. Callers hold
    /// the story's lock.
    async fn toggle_like(
        &self,
        story_id: &str,
        member_id: &str,
    ) -> Result<Option<LikeOutcome>, Report> {
        let path = Self::item_path(story_id);

        let res: Option<ItemResponse<Value>> =
            self.api.send_optional(Method::GET, &path, None).await?;
        let mut data = match res {
            Some(res) => res.data_item.data,
            None => return Ok(None),
        };

        let key = (story_id.to_string(), member_id.to_string());
        let liked = !self.likes.read().await.contains(&key);

        let current = count(data.get("likesCount").and_then(Value::as_f64));
        let likes_count = if liked {
            current + 1
        } else {
            current.saturating_sub(1)
        };
        data["likesCount"] = json!(likes_count);

        let body = json!({
            "dataCollectionId": STORIES,
            "dataItem": { "id": story_id, "data": data },
        });

        let _: Value = self.api.send(Method::PUT, &path, Some(&body)).await?;

        let mut likes = self.likes.write().await;
        if liked {
            likes.insert(key);
        } else {
            likes.remove(&key);
        }

        Ok(Some(LikeOutcome { liked, likes_count }))
    }

    fn item_path(id: &str) -> String {
        format!(
            "{}/{}?dataCollectionId={}",
            ITEMS_PATH,
            urlencoding::encode(id),
            STORIES
        )
    }
}

#[async_trait::async_trait]
impl ContentSource for CmsSource {
    fn limits(&self) -> Limits {
        Limits::LONG
    }

    #[tracing::instrument(skip(self), err)]
    async fn groups(&self) -> Result<Vec<Group>, Report> {
        let body = json!({ "query": { "paging": { "limit": GROUPS_LIMIT } } });

        let res: GroupsResponse = self
            .api
            .send(Method::POST, GROUPS_QUERY_PATH, Some(&body))
            .await?;

        Ok(res.groups.into_iter().map(Group::from).collect())
    }

    #[tracing::instrument(skip(self), err)]
    async fn group_by_slug(&self, slug: &str) -> Result<Option<Group>, Report> {
        let path = format!("{}/slug/{}", GROUPS_PATH, urlencoding::encode(slug));

        let res: Option<GroupResponse> = self.api.send_optional(Method::GET, &path, None).await?;

        Ok(res.map(|res| res.group.into()))
    }

    async fn stories_by_group(&self, slug: &str, limit: usize) -> Result<Vec<Story>, Report> {
        let stories = self
            .query_stories(story_query(
                Some(json!({ "groupSlug": slug })),
                "_createdDate",
                limit,
            ))
            .await?;

        Ok(stories
            .into_iter()
            .filter(|story| story.group_slug == slug)
            .collect())
    }

    #[tracing::instrument(skip(self), err)]
    async fn story_by_id(&self, id: &str) -> Result<Option<Story>, Report> {
        let res: Option<ItemResponse<StoryRecord>> = self
            .api
            .send_optional(Method::GET, &Self::item_path(id), None)
            .await?;

        match res {
            Some(res) => Ok(self.resolve(vec![res.data_item]).await?.into_iter().next()),
            None => Ok(None),
        }
    }

    async fn top_stories(&self, n: usize) -> Result<Vec<Story>, Report> {
        let stories = self
            .query_stories(story_query(None, "likesCount", n))
            .await?;

        Ok(most_liked(stories, n))
    }

    async fn recent_stories(&self, n: usize) -> Result<Vec<Story>, Report> {
        self.query_stories(story_query(None, "_createdDate", n))
            .await
    }

    async fn featured_story(&self) -> Result<Option<Story>, Report> {
        let stories = self
            .query_stories(story_query(
                Some(json!({ "featured": true })),
                "_createdDate",
                1,
            ))
            .await?;

        Ok(stories.into_iter().next())
    }

    async fn stories_by_author(&self, author_id: &str) -> Result<Vec<Story>, Report> {
        let filter = json!({
            "$or": [
                { "author._id": author_id },
                { "author": author_id },
            ]
        });

        self.query_stories(story_query(Some(filter), "_createdDate", PAGE_SIZE))
            .await
    }

    #[tracing::instrument(skip(self, story, author), fields(author = %author.id), err)]
    async fn insert_story(&self, story: NewStory, author: Author) -> Result<Story, Report> {
        let group = match self.group_by_slug(&story.group_slug).await? {
            Some(group) => group,
            None => return Err(Invalid::UnknownGroup.into()),
        };

        let draft = ingest(
            String::new(),
            story,
            author,
            &group,
            Utc::now(),
            self.limits(),
        )
        .await?;

        let body = json!({
            "dataCollectionId": STORIES,
            "dataItem": { "data": story_data(&draft) },
        });

        let res: ItemResponse<StoryRecord> =
            self.api.send(Method::POST, ITEMS_PATH, Some(&body)).await?;

        let stored = res.data_item.data;
        let story = Story {
            id: stored.id.or(res.data_item.id).unwrap_or_default(),
            created_at: stored
                .created_date
                .map(WixDate::into_inner)
                .unwrap_or(draft.created_at),
            ..draft
        };

        tracing::info!(story = %story.id, group = %group.slug, "inserted story");

        Ok(story)
    }

    #[tracing::instrument(skip(self), err)]
    async fn like_story(
        &self,
        story_id: &str,
        member_id: &str,
    ) -> Result<Option<LikeOutcome>, Report> {
        let guard = self.story_locks.acquire(story_id).await;

        let outcome = self.toggle_like(story_id, member_id).await;

        self.story_locks.release(story_id, guard).await;

        outcome
    }

    async fn has_liked(&self, story_id: &str, member_id: &str) -> Result<bool, Report> {
        let likes = self.likes.read().await;

        Ok(likes.contains(&(story_id.to_string(), member_id.to_string())))
    }

    #[tracing::instrument(skip(self, tokens), err)]
    async fn join_group(
        &self,
        group_id: &str,
        member_id: &str,
        tokens: &Tokens,
    ) -> Result<(), Report> {
        let uri = join_uri(
            &self.api.api_base,
            &format!("{}/{}/members/join", GROUPS_PATH, urlencoding::encode(group_id)),
        )?;

        let _: Value = send_json(
            &self.api.client,
            Method::POST,
            &uri,
            &[("Authorization", tokens.access_token.as_str())],
            Some(&json!({ "groupId": group_id })),
        )
        .await?;

        self.memberships
            .write()
            .await
            .insert((group_id.to_string(), member_id.to_string()));

        Ok(())
    }

    async fn is_group_member(&self, group_id: &str, member_id: &str) -> Result<bool, Report> {
        let memberships = self.memberships.read().await;

        Ok(memberships.contains(&(group_id.to_string(), member_id.to_string())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn members() -> HashMap<String, Option<Author>> {
        let mut members = HashMap::new();
        members.insert(
            "member-1".to_string(),
            Some(Author {
                id: "member-1".into(),
                nickname: "Daniel Park".into(),
                photo: None,
                bio: None,
            }),
        );
        members.insert("member-gone".to_string(), None);
        members
    }

    #[test]
    fn dates_in_both_shapes() {
        let wrapped: WixDate =
            serde_json::from_value(json!({ "$date": "2024-01-12T14:00:00Z" })).unwrap();
        let plain: WixDate = serde_json::from_value(json!("2024-01-12T14:00:00Z")).unwrap();

        assert_eq!(wrapped.into_inner(), plain.into_inner());
    }

    #[test]
    fn referenced_authors_resolve() {
        let res: QueryResponse<StoryRecord> = serde_json::from_value(json!({
            "dataItems": [
                {
                    "id": "item-1",
                    "dataCollectionId": "Stories",
                    "data": {
                        "_id": "item-1",
                        "title": "Quitting the Dream Job",
                        "content": "<p>On paper, I had it all.</p><iframe src=\"x\"></iframe>",
                        "author": "member-1",
                        "groupName": "Career Journeys",
                        "groupSlug": "career-journeys",
                        "_createdDate": { "$date": "2024-01-12T14:00:00Z" },
                        "likesCount": 1567.0,
                        "coverImage": "wix:image://v1/cover.jpg"
                    }
                },
                {
                    "data": {
                        "_id": "item-2",
                        "title": "Orphaned",
                        "author": "member-gone"
                    }
                }
            ]
        }))
        .unwrap();

        let mut stories = res
            .data_items
            .into_iter()
            .map(|item| item.data.into_story(item.id, &members()));

        let story = stories.next().unwrap();
        assert_eq!(story.id, "item-1");
        assert_eq!(story.author_name(), "Daniel Park");
        assert_eq!(story.likes_count, 1567);
        assert_eq!(story.comments_count, 0);
        assert_eq!(story.content, "<p>On paper, I had it all.</p>");
        assert_eq!(story.excerpt, "On paper, I had it all.");
        assert_eq!(story.read_time, Some(1));
        assert!(story.cover_image.is_none());
        assert_eq!(story.published_on(), "Jan 12, 2024");

        let orphan = stories.next().unwrap();
        assert_eq!(orphan.author_name(), "Anonymous");
        assert_eq!(orphan.read_time, None);
    }

    #[test]
    fn empty_query_answers_have_no_items() {
        let res: QueryResponse<StoryRecord> = serde_json::from_value(json!({})).unwrap();

        assert!(res.data_items.is_empty());
    }

    #[test]
    fn embedded_authors_are_kept() {
        let record: StoryRecord = serde_json::from_value(json!({
            "_id": "s1",
            "title": "The Letter I Never Sent",
            "excerpt": "x".repeat(400),
            "author": { "_id": "1", "nickname": "Maya Chen" },
            "readTime": 4,
            "featured": true
        }))
        .unwrap();

        assert!(record.author_reference().is_none());

        let story = record.into_story(None, &HashMap::new());
        assert_eq!(story.author_name(), "Maya Chen");
        assert_eq!(story.read_time, Some(4));
        assert!(story.featured);
        assert_eq!(story.excerpt.chars().count(), LONG_EXCERPT_MAX);
    }

    #[test]
    fn groups_map_counts_and_covers() {
        let res: GroupsResponse = serde_json::from_value(json!({
            "groups": [{
                "id": "g1",
                "name": "Travel Tales",
                "slug": "travel-tales",
                "membersCount": 2156,
                "postsCount": 187,
                "coverImage": { "url": "https://static.wixstatic.com/travel.jpg" }
            }]
        }))
        .unwrap();

        let group: Group = res.groups.into_iter().next().unwrap().into();
        assert_eq!(group.member_count, 2156);
        assert_eq!(group.story_count, 187);
        assert_eq!(group.description, "");
        assert_eq!(group.icon(), "✈️");
        assert_eq!(
            group.cover_image.as_deref(),
            Some("https://static.wixstatic.com/travel.jpg")
        );
    }

    #[test]
    fn queries_sort_descending() {
        let body = story_query(Some(json!({ "groupSlug": "life-lessons" })), "_createdDate", 20);

        assert_eq!(body["dataCollectionId"], STORIES);
        assert_eq!(body["query"]["filter"]["groupSlug"], "life-lessons");
        assert_eq!(body["query"]["sort"][0]["order"], "DESC");
        assert_eq!(body["query"]["paging"]["limit"], 20);

        let top = story_query(None, "likesCount", 5);
        assert!(top["query"].get("filter").is_none());
    }

    #[tokio::test]
    async fn inserted_data_carries_author_and_group() {
        let group = Group {
            id: "g1".into(),
            name: "Life Lessons".into(),
            slug: "life-lessons".into(),
            description: String::new(),
            cover_image: None,
            member_count: 0,
            story_count: 0,
            icon: None,
        };
        let author = Author {
            id: "member-1".into(),
            nickname: "Daniel Park".into(),
            photo: None,
            bio: None,
        };
        let new = NewStory {
            title: "Night Shift".into(),
            content: "Coffee at 3 AM tastes different.".into(),
            excerpt: String::new(),
            group_slug: "life-lessons".into(),
            cover_image: None,
        };

        let story = ingest(String::new(), new, author, &group, Utc::now(), Limits::LONG)
            .await
            .unwrap();
        let data = story_data(&story);

        assert_eq!(data["author"]["_id"], "member-1");
        assert_eq!(data["groupSlug"], "life-lessons");
        assert_eq!(data["readTime"], 1);
        assert_eq!(data["content"], "<p>Coffee at 3 AM tastes different.</p>");
    }

    fn offline_source() -> CmsSource {
        CmsSource::new(&WixCredentials {
            client_id: "client".into(),
            api_key: "key".into(),
            site_id: "site".into(),
            api_base: "http://127.0.0.1:9".into(),
        })
        .unwrap()
    }

    fn referencing(id: &str, member: &str) -> DataItem<StoryRecord> {
        serde_json::from_value(json!({
            "id": id,
            "data": { "_id": id, "title": id, "author": member }
        }))
        .unwrap()
    }

    #[tokio::test]
    async fn member_cache_outlives_one_page() {
        let source = offline_source();

        source
            .members
            .prime(
                "member-1".to_string(),
                members().remove("member-1").unwrap(),
            )
            .await;

        for id in ["s1", "s2"] {
            let stories = source.resolve(vec![referencing(id, "member-1")]).await.unwrap();

            assert_eq!(stories[0].author_name(), "Daniel Park");
        }
    }

    #[tokio::test]
    async fn story_locks_serialize_one_story() {
        use futures::FutureExt as _;

        let locks = StoryLocks::default();

        let first = locks.acquire("s1").await;
        let other = locks.acquire("s2").await;
        assert!(locks.acquire("s1").now_or_never().is_none());

        locks.release("s1", first).await;
        let again = locks.acquire("s1").now_or_never().unwrap();

        locks.release("s1", again).await;
        locks.release("s2", other).await;
        assert!(locks.held.lock().await.is_empty());
    }

    #[test]
    fn counts_are_never_negative() {
        assert_eq!(count(Some(-3.0)), 0);
        assert_eq!(count(Some(f64::NAN)), 0);
        assert_eq!(count(None), 0);
        assert_eq!(count(Some(12.0)), 12);
    }
}
