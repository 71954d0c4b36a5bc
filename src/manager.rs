use std::cmp::Ordering;

use chrono::Utc;
use tracing::{debug, info};

use crate::blog_post::{
    BlogPost, BlogPostPatch, ListQuery, NewBlogPost, SearchQuery, ValidBlogPost,
};
use crate::error::{Error, Result};
use crate::storage::PostStorage;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortField {
    Title,
    Content,
    Author,
    CreatedAt,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    #[default]
    Asc,
    Desc,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SortOrder {
    pub field: SortField,
    pub direction: SortDirection,
}

impl SortOrder {
    /// Parses the listing query. `None` keeps insertion order.
    pub fn from_query(query: &ListQuery) -> Result<Option<Self>> {
        let direction = match query.direction.as_deref() {
            None | Some("asc") => SortDirection::Asc,
            Some("desc") => SortDirection::Desc,
            Some(other) => return Err(Error::InvalidDirection(other.to_owned())),
        };
        let field = match query.sort.as_deref() {
            None => return Ok(None),
            Some("title") => SortField::Title,
            Some("content") => SortField::Content,
            Some("author") => SortField::Author,
            Some("created_at") => SortField::CreatedAt,
            Some(other) => return Err(Error::InvalidSort(other.to_owned())),
        };
        Ok(Some(Self { field, direction }))
    }

    fn compare(&self, a: &BlogPost, b: &BlogPost) -> Ordering {
        let ordering = match self.field {
            SortField::Title => a.title.to_lowercase().cmp(&b.title.to_lowercase()),
            SortField::Content => a.content.to_lowercase().cmp(&b.content.to_lowercase()),
            SortField::Author => a.author.to_lowercase().cmp(&b.author.to_lowercase()),
            SortField::CreatedAt => a.created_at.cmp(&b.created_at),
        };
        match self.direction {
            SortDirection::Asc => ordering,
            SortDirection::Desc => ordering.reverse(),
        }
    }
}

/// Validation, lookup and mutation of posts. Every call reloads the file.
#[derive(Clone, Debug)]
pub struct PostManager {
    storage: PostStorage,
}

impl PostManager {
    pub fn new(storage: PostStorage) -> Self {
        Self { storage }
    }

    pub fn storage(&self) -> &PostStorage {
        &self.storage
    }

    /// Every required field must be present and non-empty.
    pub fn validate(new_post: NewBlogPost) -> Result<ValidBlogPost> {
        let NewBlogPost {
            title,
            content,
            author,
        } = new_post;
        let present = |value: Option<String>| value.filter(|v| !v.is_empty());
        let (title, content, author) = (present(title), present(content), present(author));

        match (title, content, author) {
            (Some(title), Some(content), Some(author)) => Ok(ValidBlogPost {
                title,
                content,
                author,
            }),
            (title, content, author) => {
                let missing = [
                    ("title", title.is_none()),
                    ("content", content.is_none()),
                    ("author", author.is_none()),
                ]
                .into_iter()
                .filter_map(|(field, missing)| missing.then_some(field))
                .collect();
                Err(Error::MissingFields(missing))
            }
        }
    }

    pub fn get_all_posts(&self, order: Option<SortOrder>) -> Result<Vec<BlogPost>> {
        let mut posts = self.storage.load_posts()?;
        if let Some(order) = order {
            posts.sort_by(|a, b| order.compare(a, b));
        }
        Ok(posts)
    }

    pub fn get_post_by_id(&self, id: u64) -> Result<Option<BlogPost>> {
        Ok(self.storage.load_posts()?.into_iter().find(|p| p.id == id))
    }

    pub fn add_post(&self, new_post: ValidBlogPost) -> Result<BlogPost> {
        let mut posts = self.storage.load_posts()?;
        let post = BlogPost {
            id: next_id(&posts)?,
            title: new_post.title,
            content: new_post.content,
            author: new_post.author,
            created_at: Utc::now(),
            updated_at: None,
        };
        posts.push(post.clone());
        self.storage.save_posts(&posts)?;
        info!(id = post.id, "created post");
        Ok(post)
    }

    /// Applies the provided fields and stamps `updated_at`.
    /// Returns `None` without writing when the id is unknown.
    pub fn update_post(&self, id: u64, patch: BlogPostPatch) -> Result<Option<BlogPost>> {
        let mut posts = self.storage.load_posts()?;
        let Some(post) = posts.iter_mut().find(|p| p.id == id) else {
            debug!(id, "update of unknown post");
            return Ok(None);
        };

        if let Some(title) = patch.title {
            post.title = title;
        }
        if let Some(content) = patch.content {
            post.content = content;
        }
        if let Some(author) = patch.author {
            post.author = author;
        }
        post.updated_at = Some(Utc::now());
        let updated = post.clone();

        self.storage.save_posts(&posts)?;
        info!(id, "updated post");
        Ok(Some(updated))
    }

    pub fn delete_post(&self, id: u64) -> Result<bool> {
        let mut posts = self.storage.load_posts()?;
        let Some(index) = posts.iter().position(|p| p.id == id) else {
            debug!(id, "delete of unknown post");
            return Ok(false);
        };
        posts.remove(index);
        self.storage.save_posts(&posts)?;
        info!(id, "deleted post");
        Ok(true)
    }

    pub fn search_posts(&self, query: &SearchQuery) -> Result<Vec<BlogPost>> {
        let posts = self.storage.load_posts()?;
        Ok(posts
            .into_iter()
            .filter(|post| matches_query(post, query))
            .collect())
    }
}

fn next_id(posts: &[BlogPost]) -> Result<u64> {
    match posts.iter().map(|p| p.id).max() {
        None => Ok(1),
        Some(max) => max
            .checked_add(1)
            .ok_or_else(|| Error::internal(format!("no post id left after {max}"))),
    }
}

/// Case-insensitive substring match on every provided field.
fn matches_query(post: &BlogPost, query: &SearchQuery) -> bool {
    query.criteria().all(|(field, needle)| {
        post.field(field)
            .unwrap_or_default()
            .to_lowercase()
            .contains(&needle.to_lowercase())
    })
}
