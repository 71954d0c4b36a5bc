use actix_web::{delete, get, post, put, web, HttpResponse};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::blog_post::{BlogPostPatch, ListQuery, NewBlogPost, SearchQuery};
use crate::error::{Error, Result};
use crate::manager::{PostManager, SortOrder};

#[derive(Debug, Deserialize, Serialize)]
pub struct ApiMessage {
    pub message: String,
}

/// Runs file-backed manager work on actix's blocking pool.
pub async fn run_blocking<T, F>(manager: &web::Data<PostManager>, work: F) -> Result<T>
where
    F: FnOnce(&PostManager) -> Result<T> + Send + 'static,
    T: Send + 'static,
{
    let manager = manager.clone();
    web::block(move || work(&manager))
        .await
        .map_err(|err| Error::internal(err.to_string()))?
}

#[get("/api/posts")]
pub async fn list_posts(
    manager: web::Data<PostManager>,
    query: web::Query<ListQuery>,
) -> Result<HttpResponse> {
    let order = SortOrder::from_query(&query)?;
    let posts = run_blocking(&manager, move |manager| manager.get_all_posts(order)).await?;
    Ok(HttpResponse::Ok().json(posts))
}

#[post("/api/posts")]
pub async fn create_post(
    manager: web::Data<PostManager>,
    body: web::Json<Map<String, Value>>,
) -> Result<HttpResponse> {
    let new_post = NewBlogPost::try_from(body.into_inner())?;
    let valid = PostManager::validate(new_post)?;
    let post = run_blocking(&manager, move |manager| manager.add_post(valid)).await?;
    Ok(HttpResponse::Created().json(post))
}

#[get("/api/posts/search")]
pub async fn search_posts(
    manager: web::Data<PostManager>,
    query: web::Query<SearchQuery>,
) -> Result<HttpResponse> {
    let query = query.into_inner();
    let posts = run_blocking(&manager, move |manager| manager.search_posts(&query)).await?;
    Ok(HttpResponse::Ok().json(posts))
}

#[get("/api/posts/{id}")]
pub async fn get_post(manager: web::Data<PostManager>, id: web::Path<u64>) -> Result<HttpResponse> {
    let id = id.into_inner();
    match run_blocking(&manager, move |manager| manager.get_post_by_id(id)).await? {
        Some(post) => Ok(HttpResponse::Ok().json(post)),
        None => Err(Error::NotFound { id }),
    }
}

#[put("/api/posts/{id}")]
pub async fn update_post(
    manager: web::Data<PostManager>,
    id: web::Path<u64>,
    body: web::Json<Map<String, Value>>,
) -> Result<HttpResponse> {
    let id = id.into_inner();
    let patch = BlogPostPatch::try_from(body.into_inner())?;
    match run_blocking(&manager, move |manager| manager.update_post(id, patch)).await? {
        Some(post) => Ok(HttpResponse::Ok().json(post)),
        None => Err(Error::NotFound { id }),
    }
}

#[delete("/api/posts/{id}")]
pub async fn delete_post(
    manager: web::Data<PostManager>,
    id: web::Path<u64>,
) -> Result<HttpResponse> {
    let id = id.into_inner();
    if run_blocking(&manager, move |manager| manager.delete_post(id)).await? {
        Ok(HttpResponse::Ok().json(ApiMessage {
            message: format!("Post with id {id} has been deleted successfully."),
        }))
    } else {
        Err(Error::NotFound { id })
    }
}
