use std::path::Path;

use anyhow::{Context, Result};
use axum::{
    Json,
    extract::{Path as UrlPath, Query, State},
    http::StatusCode,
    response::IntoResponse,
};
use serde::Deserialize;
use tracing::info;

use fable_core::toc;
use fable_types::api::{ArticleResponse, PostListResponse};
use fable_types::models::{Post, PostSummary};

use crate::auth::AppState;

const POSTS_PER_PAGE: usize = 6;
const RELATED_LIMIT: usize = 3;

/// The static content source, loaded once at startup: the full posts from
/// `posts.json` and the lighter `posts-index.json` used for listings.
pub struct ContentLibrary {
    posts: Vec<Post>,
    index: Vec<PostSummary>,
}

impl ContentLibrary {
    pub fn load(dir: &Path) -> Result<Self> {
        let posts_path = dir.join("posts.json");
        let index_path = dir.join("posts-index.json");

        let posts_raw = std::fs::read_to_string(&posts_path)
            .with_context(|| format!("reading {}", posts_path.display()))?;
        let index_raw = std::fs::read_to_string(&index_path)
            .with_context(|| format!("reading {}", index_path.display()))?;

        let library = Self::from_json(&posts_raw, &index_raw)?;
        info!(
            "Loaded {} posts ({} index entries) from {}",
            library.posts.len(),
            library.index.len(),
            dir.display()
        );
        Ok(library)
    }

    pub fn from_json(posts_raw: &str, index_raw: &str) -> Result<Self> {
        let posts: Vec<Post> = serde_json::from_str(posts_raw).context("parsing posts.json")?;
        let index: Vec<PostSummary> =
            serde_json::from_str(index_raw).context("parsing posts-index.json")?;
        Ok(Self { posts, index })
    }

    pub fn get(&self, id: &str) -> Option<&Post> {
        self.posts.iter().find(|p| p.id == id)
    }

    /// The post shown in the featured slot: the first entry flagged
    /// featured, else the first entry.
    pub fn featured(&self) -> Option<&PostSummary> {
        self.index
            .iter()
            .find(|p| p.featured)
            .or_else(|| self.index.first())
    }

    pub fn filtered(&self, tag: Option<&str>) -> Vec<&PostSummary> {
        match tag {
            Some(tag) => self
                .index
                .iter()
                .filter(|p| p.tags.iter().any(|t| t == tag))
                .collect(),
            None => self.index.iter().collect(),
        }
    }

    /// Posts sharing at least one tag with `id`, most overlap first, the
    /// post itself excluded.
    pub fn related(&self, id: &str, limit: usize) -> Vec<PostSummary> {
        let Some(post) = self.get(id) else {
            return Vec::new();
        };

        let mut scored: Vec<(usize, &PostSummary)> = self
            .index
            .iter()
            .filter(|p| p.id != id)
            .filter_map(|p| {
                let shared = p.tags.iter().filter(|t| post.tags.contains(t)).count();
                (shared > 0).then_some((shared, p))
            })
            .collect();

        scored.sort_by(|a, b| b.0.cmp(&a.0).then_with(|| b.1.date.cmp(&a.1.date)));
        scored.into_iter().take(limit).map(|(_, p)| p.clone()).collect()
    }
}

#[derive(Debug, Deserialize)]
pub struct PostListQuery {
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default = "default_page")]
    pub page: usize,
    #[serde(default = "default_per_page")]
    pub per_page: usize,
}

fn default_page() -> usize {
    1
}

fn default_per_page() -> usize {
    POSTS_PER_PAGE
}

pub async fn list_posts(
    State(state): State<AppState>,
    Query(query): Query<PostListQuery>,
) -> impl IntoResponse {
    let filtered = state.content.filtered(query.tag.as_deref());
    let total = filtered.len();
    let per_page = query.per_page.clamp(1, 50);
    let page = query.page.max(1);

    let posts: Vec<PostSummary> = filtered
        .into_iter()
        .skip(page_offset(page, per_page))
        .take(per_page)
        .cloned()
        .collect();

    // The featured slot only appears on the unfiltered first page.
    let featured = (page == 1 && query.tag.is_none())
        .then(|| state.content.featured().cloned())
        .flatten();

    Json(PostListResponse {
        posts,
        total,
        page,
        per_page,
        featured,
    })
}

/// First index of the requested page. Saturating: `page` and `per_page`
/// come straight off the query string, and an absurd page just lands past
/// the end (empty result), never in a panic or a wrapped offset.
fn page_offset(page: usize, per_page: usize) -> usize {
    page.saturating_sub(1).saturating_mul(per_page)
}

pub async fn get_post(
    State(state): State<AppState>,
    UrlPath(post_id): UrlPath<String>,
) -> Result<impl IntoResponse, StatusCode> {
    let post = state.content.get(&post_id).ok_or(StatusCode::NOT_FOUND)?;

    let (content, toc) = toc::build(&post.content);
    let mut post = post.clone();
    post.content = content;

    let related = state.content.related(&post_id, RELATED_LIMIT);

    Ok(Json(ArticleResponse { post, toc, related }))
}

#[cfg(test)]
mod tests {
    use super::*;

    const POSTS: &str = r#"[
        {"id": "rust-errors", "title": "Error Handling", "excerpt": "e1",
         "content": "<h2>Intro</h2><p>body</p>", "tags": ["rust", "errors"],
         "date": "2026-03-01", "readTime": 7, "author": "Ada", "featured": true},
        {"id": "rust-traits", "title": "Traits", "excerpt": "e2",
         "content": "<p>no headings</p>", "tags": ["rust"],
         "date": "2026-04-01", "readTime": 5, "author": "Ada"},
        {"id": "gardening", "title": "Gardening", "excerpt": "e3",
         "content": "<p>x</p>", "tags": ["plants"],
         "date": "2026-05-01", "readTime": 3, "author": "Bee"}
    ]"#;

    const INDEX: &str = r#"[
        {"id": "rust-errors", "title": "Error Handling", "excerpt": "e1",
         "tags": ["rust", "errors"], "date": "2026-03-01", "readTime": 7, "featured": true},
        {"id": "rust-traits", "title": "Traits", "excerpt": "e2",
         "tags": ["rust"], "date": "2026-04-01", "readTime": 5},
        {"id": "gardening", "title": "Gardening", "excerpt": "e3",
         "tags": ["plants"], "date": "2026-05-01", "readTime": 3}
    ]"#;

    fn library() -> ContentLibrary {
        ContentLibrary::from_json(POSTS, INDEX).unwrap()
    }

    #[test]
    fn featured_prefers_flagged_post() {
        let lib = library();
        assert_eq!(lib.featured().unwrap().id, "rust-errors");
    }

    #[test]
    fn tag_filter_matches_index_tags() {
        let lib = library();
        let rust: Vec<&str> = lib.filtered(Some("rust")).iter().map(|p| p.id.as_str()).collect();
        assert_eq!(rust, vec!["rust-errors", "rust-traits"]);
        assert!(lib.filtered(Some("haskell")).is_empty());
        assert_eq!(lib.filtered(None).len(), 3);
    }

    #[test]
    fn page_offset_saturates_on_huge_pages() {
        assert_eq!(page_offset(1, 6), 0);
        assert_eq!(page_offset(3, 6), 12);
        // A hostile ?page= must fall past the end, not overflow.
        assert_eq!(page_offset(usize::MAX, 50), usize::MAX);
        assert!(library()
            .filtered(None)
            .into_iter()
            .skip(page_offset(usize::MAX, 50))
            .next()
            .is_none());
    }

    #[test]
    fn related_requires_shared_tags_and_excludes_self() {
        let lib = library();
        let related = lib.related("rust-errors", 3);
        assert_eq!(related.len(), 1);
        assert_eq!(related[0].id, "rust-traits");

        assert!(lib.related("gardening", 3).is_empty());
        assert!(lib.related("unknown", 3).is_empty());
    }
}
