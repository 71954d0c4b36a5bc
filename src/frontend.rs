use actix_web::{get, http::header::ContentType, web, HttpResponse};
use askama::Template;
use chrono::{DateTime, Utc};

use crate::api::run_blocking;
use crate::blog_post::BlogPost;
use crate::error::Result;
use crate::manager::PostManager;

const DISPLAY_FORMAT: &str = "%B %d, %Y, %I:%M %p";

pub struct PostView {
    pub id: u64,
    pub title: String,
    pub content: String,
    pub author: String,
    pub created: String,
    pub updated: Option<String>,
}

impl From<BlogPost> for PostView {
    fn from(post: BlogPost) -> Self {
        Self {
            id: post.id,
            title: post.title,
            content: post.content,
            author: post.author,
            created: display_time(&post.created_at),
            updated: post.updated_at.as_ref().map(display_time),
        }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate {
    posts: Vec<PostView>,
}

/// `January 05, 2024, 03:07 PM`
pub fn display_time(at: &DateTime<Utc>) -> String {
    at.format(DISPLAY_FORMAT).to_string()
}

#[get("/")]
pub async fn index(manager: web::Data<PostManager>) -> Result<HttpResponse> {
    let posts = run_blocking(&manager, |manager| manager.get_all_posts(None)).await?;
    let page = IndexTemplate {
        posts: posts.into_iter().map(PostView::from).collect(),
    }
    .render()?;
    Ok(HttpResponse::Ok().content_type(ContentType::html()).body(page))
}
