use std::sync::Arc;

use axum::{
    extract::{Extension, Path, Query},
    response::{IntoResponse, Response},
};
use coolstory_common::{models::Story, submission::StoryDraft};
use coolstory_content::{best_effort, CommentBoard, SharedContent, PAGE_SIZE};
use coolstory_identity::Session;

use crate::{
    session::{login_redirect, Visitor},
    views::{
        self, render, AboutPage, Card, CardVariant, GroupPage, GroupsPage, IndexPage, Layout,
        NewStoryPage, ProfilePage, StoryPage,
    },
    Error,
};

/// Stories in the "Most loved" sidebar.
const LOVED: usize = 5;

/// Minimal cards under a story.
const MORE_FROM_GROUP: usize = 3;

#[derive(Debug, Default, serde::Deserialize)]
pub struct FeedQuery {
    #[serde(default)]
    pub group: Option<String>,
}

impl FeedQuery {
    pub fn group(&self) -> Option<&str> {
        selected_group(self.group.as_deref())
    }
}

/// A blank or missing group is the "All" selection, `None`.
pub fn selected_group(group: Option<&str>) -> Option<&str> {
    group.map(str::trim).filter(|slug| !slug.is_empty())
}

/// The home feed, split into its leading featured card and the rest.
pub async fn feed(content: &SharedContent, group: Option<&str>) -> (Option<Card>, Vec<Card>) {
    let mut stories = match group {
        Some(slug) => {
            best_effort("group stories", content.stories_by_group(slug, PAGE_SIZE)).await
        }
        None => {
            let mut stories =
                best_effort("recent stories", content.recent_stories(PAGE_SIZE)).await;
            let featured = best_effort("featured story", content.featured_story()).await;

            if let Some(featured) = featured {
                stories.retain(|story| story.id != featured.id);
                stories.insert(0, featured);
            }

            stories
        }
    };

    if stories.is_empty() {
        return (None, Vec::new());
    }

    let featured = stories.remove(0);

    (
        Some(Card::new(featured, CardVariant::Featured)),
        Card::list(stories, CardVariant::Default),
    )
}

pub async fn index(
    Extension(content): Extension<SharedContent>,
    Visitor(session): Visitor,
    Query(query): Query<FeedQuery>,
) -> Result<impl IntoResponse, Error> {
    let groups = best_effort("groups", content.groups()).await;
    let (featured, cards) = feed(&content, query.group()).await;
    let loved = best_effort("top stories", content.top_stories(LOVED)).await;

    render(IndexPage {
        layout: Layout::new("Share a Cool Story", &session),
        groups,
        selected: query.group().map(str::to_string),
        featured,
        cards,
        loved: Card::list(loved, CardVariant::Compact),
        script: views::FEED_SCRIPT,
    })
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct GroupsQuery {
    #[serde(default)]
    q: Option<String>,
}

pub async fn groups(
    Extension(content): Extension<SharedContent>,
    Visitor(session): Visitor,
    Query(query): Query<GroupsQuery>,
) -> Result<impl IntoResponse, Error> {
    let search = query.q.unwrap_or_default().trim().to_string();
    let needle = search.to_lowercase();

    let groups = best_effort("groups", content.groups())
        .await
        .into_iter()
        .filter(|group| {
            needle.is_empty()
                || group.name.to_lowercase().contains(&needle)
                || group.description.to_lowercase().contains(&needle)
        })
        .collect();

    render(GroupsPage {
        layout: Layout::new("Communities", &session),
        groups,
        query: search,
    })
}

pub async fn group(
    Extension(content): Extension<SharedContent>,
    Visitor(session): Visitor,
    Path(slug): Path<String>,
) -> Result<Response, Error> {
    let group = match best_effort("group", content.group_by_slug(&slug)).await {
        Some(group) => group,
        None => return views::not_found(&session, "Group not found"),
    };

    let stories = best_effort("group stories", content.stories_by_group(&slug, PAGE_SIZE)).await;

    let is_member = match &session.member {
        Some(member) => {
            best_effort("membership", content.is_group_member(&group.id, &member.id)).await
        }
        None => false,
    };

    Ok(render(GroupPage {
        layout: Layout::new(group.name.clone(), &session),
        group,
        cards: Card::list(stories, CardVariant::Default),
        is_member,
    })?
    .into_response())
}

pub async fn story(
    Extension(content): Extension<SharedContent>,
    Extension(comments): Extension<Arc<CommentBoard>>,
    Visitor(session): Visitor,
    Path(id): Path<String>,
) -> Result<Response, Error> {
    let story = match best_effort("story", content.story_by_id(&id)).await {
        Some(story) => story,
        None => return views::not_found(&session, "Story not found"),
    };

    let liked = match &session.member {
        Some(member) => best_effort("like state", content.has_liked(&story.id, &member.id)).await,
        None => false,
    };

    let more = more_from_group(&content, &story).await;

    Ok(render(StoryPage {
        layout: Layout::new(story.title.clone(), &session),
        comments: comments.for_story(&story.id).await,
        more: Card::list(more, CardVariant::Minimal),
        liked,
        story,
    })?
    .into_response())
}

async fn more_from_group(content: &SharedContent, story: &Story) -> Vec<Story> {
    if story.group_slug.is_empty() {
        return Vec::new();
    }

    best_effort(
        "group stories",
        content.stories_by_group(&story.group_slug, MORE_FROM_GROUP + 1),
    )
    .await
    .into_iter()
    .filter(|other| other.id != story.id)
    .take(MORE_FROM_GROUP)
    .collect()
}

#[derive(Debug, Default, serde::Deserialize)]
pub struct NewStoryQuery {
    #[serde(default)]
    group: Option<String>,
}

pub async fn new_story(
    Extension(content): Extension<SharedContent>,
    Visitor(session): Visitor,
    Query(query): Query<NewStoryQuery>,
) -> Result<impl IntoResponse, Error> {
    let draft = StoryDraft {
        group: query.group.unwrap_or_default(),
        ..StoryDraft::default()
    };

    new_story_form(&content, &session, draft, None).await
}

pub async fn new_story_form(
    content: &SharedContent,
    session: &Session,
    draft: StoryDraft,
    error: Option<String>,
) -> Result<impl IntoResponse, Error> {
    render(NewStoryPage {
        layout: Layout::new("Share Your Story", session),
        groups: best_effort("groups", content.groups()).await,
        limits: content.limits(),
        draft,
        error,
    })
}

pub async fn profile(
    Extension(content): Extension<SharedContent>,
    Visitor(session): Visitor,
) -> Result<Response, Error> {
    let member = match session.member.clone() {
        Some(member) => member,
        None => return login_redirect("/profile"),
    };

    let stories = best_effort("member stories", content.stories_by_author(&member.id)).await;

    Ok(render(ProfilePage {
        layout: Layout::new(member.display_name().to_string(), &session),
        cards: Card::list(stories, CardVariant::Default),
        member,
    })?
    .into_response())
}

pub async fn about(Visitor(session): Visitor) -> Result<impl IntoResponse, Error> {
    render(AboutPage {
        layout: Layout::new("About", &session),
    })
}

pub async fn fallback(Visitor(session): Visitor) -> Result<Response, Error> {
    views::not_found(&session, "Page not found")
}
