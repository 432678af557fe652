use askama::Template;
use axum::{
    extract::{Extension, Query},
    response::IntoResponse,
    Json,
};
use coolstory_content::SharedContent;

use crate::{
    pages::{feed, selected_group},
    views::FeedFragment,
    Error,
};

#[derive(Debug, serde::Deserialize)]
pub struct FeedApiQuery {
    #[serde(default)]
    group: Option<String>,
    /// Echoed back so the caller can drop answers to requests it has
    /// already superseded.
    #[serde(default)]
    generation: Option<u64>,
}

#[derive(Debug, serde::Serialize)]
pub struct FeedApiResponse {
    pub generation: u64,
    pub group: Option<String>,
    pub count: usize,
    pub html: String,
}

pub async fn stories(
    Extension(content): Extension<SharedContent>,
    Query(query): Query<FeedApiQuery>,
) -> Result<impl IntoResponse, Error> {
    let group = selected_group(query.group.as_deref());
    let (featured, cards) = feed(&content, group).await;

    let count = cards.len() + usize::from(featured.is_some());
    let html = FeedFragment { featured, cards }
        .render()
        .map_err(Error::from_any)?;

    Ok(Json(FeedApiResponse {
        generation: query.generation.unwrap_or(0),
        group: group.map(str::to_string),
        count,
        html,
    }))
}
