use std::sync::Arc;

use axum::{
    extract::{ContentLengthLimit, Extension, Form, Path},
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use coolstory_common::{
    models::Member,
    submission::{Invalid, StoryDraft},
};
use coolstory_content::{CommentBoard, SharedContent};
use coolstory_identity::{Session, Tokens};

use crate::{
    pages::new_story_form,
    session::{login_redirect, Visitor},
    views, Error,
};

/// Largest story submission accepted, in bytes.
const STORY_FORM_LIMIT: u64 = 256 * 1024;

const COMMENT_FORM_LIMIT: u64 = 16 * 1024;

fn signed_in(session: &Session) -> Option<(&Member, &Tokens)> {
    match (&session.member, &session.tokens) {
        (Some(member), Some(tokens)) => Some((member, tokens)),
        _ => None,
    }
}

#[tracing::instrument(skip(content, session))]
pub async fn like(
    Extension(content): Extension<SharedContent>,
    Visitor(session): Visitor,
    Path(id): Path<String>,
) -> Result<Response, Error> {
    let back = format!("/stories/{}", id);
    let (member, _) = match signed_in(&session) {
        Some(signed) => signed,
        None => return login_redirect(&back),
    };

    match content.like_story(&id, &member.id).await {
        Ok(Some(outcome)) => {
            tracing::debug!(liked = outcome.liked, likes = outcome.likes_count, "toggled like");
        }
        Ok(None) => {
            return views::not_found(&session, "Story not found");
        }
        Err(err) => {
            tracing::error!(error = ?err, "unable to like story");
        }
    }

    Ok(Redirect::to(&back).into_response())
}

#[derive(Debug, serde::Deserialize)]
pub struct CommentForm {
    #[serde(default)]
    content: String,
}

#[tracing::instrument(skip(content, comments, session, form))]
pub async fn comment(
    Extension(content): Extension<SharedContent>,
    Extension(comments): Extension<Arc<CommentBoard>>,
    Visitor(session): Visitor,
    Path(id): Path<String>,
    ContentLengthLimit(Form(form)): ContentLengthLimit<Form<CommentForm>, COMMENT_FORM_LIMIT>,
) -> Result<Response, Error> {
    let back = format!("/stories/{}", id);
    let (member, _) = match signed_in(&session) {
        Some(signed) => signed,
        None => return login_redirect(&back),
    };

    if content.story_by_id(&id).await?.is_none() {
        return views::not_found(&session, "Story not found");
    }

    comments.post(&id, &form.content, member.as_author()).await;

    Ok(Redirect::to(&format!("{}#comments", back)).into_response())
}

#[tracing::instrument(skip(content, session))]
pub async fn join(
    Extension(content): Extension<SharedContent>,
    Visitor(session): Visitor,
    Path(slug): Path<String>,
) -> Result<Response, Error> {
    let back = format!("/groups/{}", slug);
    let (member, tokens) = match signed_in(&session) {
        Some(signed) => signed,
        None => return login_redirect(&back),
    };

    let group = match content.group_by_slug(&slug).await? {
        Some(group) => group,
        None => return views::not_found(&session, "Group not found"),
    };

    if let Err(err) = content.join_group(&group.id, &member.id, tokens).await {
        tracing::error!(error = ?err, "unable to join group");
    }

    Ok(Redirect::to(&back).into_response())
}

#[tracing::instrument(skip(content, session, draft))]
pub async fn create_story(
    Extension(content): Extension<SharedContent>,
    Visitor(session): Visitor,
    ContentLengthLimit(Form(draft)): ContentLengthLimit<Form<StoryDraft>, STORY_FORM_LIMIT>,
) -> Result<Response, Error> {
    let member = match session.member.clone() {
        Some(member) => member,
        None => return login_redirect("/stories/new"),
    };

    let story = match draft.validate(content.limits()) {
        Ok(story) => story,
        Err(invalid) => {
            tracing::debug!(reason = %invalid, "rejected submission");

            return form_error(
                &content,
                &session,
                draft,
                StatusCode::UNPROCESSABLE_ENTITY,
                invalid.to_string(),
            )
            .await;
        }
    };

    match content.insert_story(story, member.as_author()).await {
        Ok(story) => Ok(Redirect::to(&format!("/stories/{}", story.id)).into_response()),
        Err(err) => {
            let (status, message) = match err.downcast_ref::<Invalid>() {
                Some(invalid) => (StatusCode::UNPROCESSABLE_ENTITY, invalid.to_string()),
                None => {
                    tracing::error!(error = ?err, "unable to insert story");

                    (
                        StatusCode::BAD_GATEWAY,
                        "We could not publish your story right now. Please try again.".to_string(),
                    )
                }
            };

            form_error(&content, &session, draft, status, message).await
        }
    }
}

async fn form_error(
    content: &SharedContent,
    session: &Session,
    draft: StoryDraft,
    status: StatusCode,
    message: String,
) -> Result<Response, Error> {
    let page = new_story_form(content, session, draft, Some(message)).await?;

    Ok((status, page).into_response())
}
