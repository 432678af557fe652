use std::sync::atomic::{AtomicU64, Ordering};

use chrono::Utc;
use coolstory_common::{
    models::{Author, Comment},
    submission::clamp_chars,
};
use tokio::sync::RwLock;

/// Longest comment kept, in characters.
pub const COMMENT_MAX: usize = 2000;

/// Story comments, held by this process only.
pub struct CommentBoard {
    comments: RwLock<Vec<Comment>>,
    next_id: AtomicU64,
}

impl CommentBoard {
    pub fn new(seed: Vec<Comment>) -> Self {
        Self {
            comments: RwLock::new(seed),
            next_id: AtomicU64::new(1),
        }
    }

    /// Newest first.
    pub async fn for_story(&self, story_id: &str) -> Vec<Comment> {
        let comments = self.comments.read().await;

        let mut found = comments
            .iter()
            .filter(|comment| comment.story_id == story_id)
            .cloned()
            .collect::<Vec<_>>();

        found.sort_by(|a, b| b.created_at.cmp(&a.created_at));

        found
    }

    /// Blank comments are ignored and return `None`.
    #[tracing::instrument(skip(self, content, author), fields(author = %author.id))]
    pub async fn post(&self, story_id: &str, content: &str, author: Author) -> Option<Comment> {
        let content = content.trim();
        if content.is_empty() {
            tracing::debug!("ignoring blank comment");

            return None;
        }

        let comment = Comment {
            id: format!("local-{}", self.next_id.fetch_add(1, Ordering::Relaxed)),
            story_id: story_id.to_string(),
            content: clamp_chars(content, COMMENT_MAX).to_string(),
            author,
            created_at: Utc::now(),
            likes_count: 0,
        };

        self.comments.write().await.push(comment.clone());

        Some(comment)
    }
}

impl Default for CommentBoard {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}
