use actix_web::error::{InternalError, JsonPayloadError, QueryPayloadError};
use actix_web::{middleware, web, App, HttpRequest, HttpServer, ResponseError};
use clap::Parser;
use tracing::info;

mod api;
mod blog_post;
mod config;
mod error;
mod frontend;
mod logging;
mod manager;
mod storage;

use config::{CliArgs, Settings};
use manager::PostManager;
use storage::PostStorage;

fn json_error_handler(err: JsonPayloadError, _req: &HttpRequest) -> actix_web::Error {
    tracing::debug!(error = %err, "rejected request body");
    let rejection = match &err {
        JsonPayloadError::ContentType => error::Error::ContentType,
        _ => error::Error::InvalidJson,
    };
    InternalError::from_response(err, rejection.error_response()).into()
}

fn query_error_handler(err: QueryPayloadError, _req: &HttpRequest) -> actix_web::Error {
    tracing::debug!(error = %err, "rejected query string");
    let detail = match &err {
        QueryPayloadError::Deserialize(inner) => inner.to_string(),
        other => other.to_string(),
    };
    InternalError::from_response(err, error::Error::InvalidQuery(detail).error_response()).into()
}

fn configure(cfg: &mut web::ServiceConfig) {
    // search must be registered ahead of the `{id}` routes
    cfg.service(api::search_posts)
        .service(api::list_posts)
        .service(api::create_post)
        .service(api::get_post)
        .service(api::update_post)
        .service(api::delete_post)
        .service(frontend::index)
        .app_data(
            web::JsonConfig::default()
                // register error_handler for JSON extractors.
                .error_handler(json_error_handler),
        )
        .app_data(web::QueryConfig::default().error_handler(query_error_handler));
}

#[actix_web::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let settings = Settings::from_args(CliArgs::parse())?;
    logging::init(&settings.logging)?;

    let manager = web::Data::new(PostManager::new(PostStorage::new(&settings.data_file)));
    info!(
        addr = %settings.addr,
        data_file = %manager.storage().path().display(),
        "starting masterblog"
    );

    HttpServer::new(move || {
        App::new()
            .wrap(middleware::Logger::default())
            .app_data(manager.clone())
            .configure(configure)
    })
    .bind(settings.addr)?
    .run()
    .await?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use actix_web::{dev::ServiceResponse, http::StatusCode, test, web::Bytes};
    use serde_json::{json, Value};

    use super::*;
    use crate::api::ApiMessage;
    use crate::blog_post::BlogPost;
    use crate::error::ApiError;

    struct TestBlog {
        _dir: tempfile::TempDir,
        manager: web::Data<PostManager>,
    }

    impl TestBlog {
        fn new() -> Self {
            let dir = tempfile::tempdir().unwrap();
            let storage = PostStorage::new(dir.path().join("posts.json"));
            Self {
                _dir: dir,
                manager: web::Data::new(PostManager::new(storage)),
            }
        }

        async fn call(&self, req: test::TestRequest) -> ServiceResponse {
            let app = test::init_service(
                App::new()
                    .app_data(self.manager.clone())
                    .configure(configure),
            )
            .await;
            test::call_service(&app, req.to_request()).await
        }

        async fn send_json(&self, req: test::TestRequest, body: &str) -> ServiceResponse {
            self.call(
                req.insert_header(("Content-Type", "application/json"))
                    .set_payload(Bytes::from(body.to_owned())),
            )
            .await
        }

        async fn create(&self, title: &str, content: &str, author: &str) -> BlogPost {
            let body = json!({"title": title, "content": content, "author": author}).to_string();
            let resp = self
                .send_json(test::TestRequest::post().uri("/api/posts"), &body)
                .await;
            assert_eq!(resp.status(), StatusCode::CREATED);
            test::read_body_json(resp).await
        }

        async fn list(&self, uri: &str) -> Vec<BlogPost> {
            let resp = self.call(test::TestRequest::get().uri(uri)).await;
            assert_eq!(resp.status(), StatusCode::OK);
            test::read_body_json(resp).await
        }
    }

    #[actix_web::test]
    async fn test_creating_a_post() {
        let blog = TestBlog::new();
        let post = blog.create("Hello", "World", "Will").await;
        assert_eq!(post.id, 1);
        assert_eq!(post.title, "Hello");
        assert_eq!(post.author, "Will");
        assert!(post.updated_at.is_none());

        assert_eq!(blog.list("/api/posts").await, vec![post]);
    }

    #[actix_web::test]
    async fn test_creating_a_post_with_missing_fields() {
        let blog = TestBlog::new();
        let resp = blog
            .send_json(
                test::TestRequest::post().uri("/api/posts"),
                r#"{"title": "foo", "author": ""}"#,
            )
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: ApiError = test::read_body_json(resp).await;
        assert_eq!(body.error, "Missing fields: content, author");
    }

    #[actix_web::test]
    async fn test_creating_a_post_with_invalid_json() {
        let blog = TestBlog::new();
        let resp = blog
            .send_json(test::TestRequest::post().uri("/api/posts"), "{not json")
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: ApiError = test::read_body_json(resp).await;
        assert_eq!(body.error, "Invalid JSON format");
    }

    async fn assert_invalid_json(resp: ServiceResponse) {
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: ApiError = test::read_body_json(resp).await;
        assert_eq!(body.error, "Invalid JSON format");
    }

    #[actix_web::test]
    async fn test_creating_a_post_from_a_non_object() {
        let blog = TestBlog::new();
        for body in ["[]", r#"["a","b","c"]"#, "{}", r#"{"title": 1, "content": "c", "author": "a"}"#] {
            let resp = blog
                .send_json(test::TestRequest::post().uri("/api/posts"), body)
                .await;
            assert_invalid_json(resp).await;
        }
        assert!(blog.list("/api/posts").await.is_empty());
    }

    #[actix_web::test]
    async fn test_updating_a_post_from_a_non_object() {
        let blog = TestBlog::new();
        let post = blog.create("Hello", "World", "Will").await;
        for body in ["[]", r#"["a","b","c"]"#, r#"{"title": false}"#] {
            let resp = blog
                .send_json(test::TestRequest::put().uri("/api/posts/1"), body)
                .await;
            assert_invalid_json(resp).await;
        }
        assert_eq!(blog.list("/api/posts").await, vec![post]);
    }

    #[actix_web::test]
    async fn test_creating_a_post_without_content_type() {
        let blog = TestBlog::new();
        let resp = blog
            .call(
                test::TestRequest::post()
                    .uri("/api/posts")
                    .set_payload(Bytes::from_static(b"{}")),
            )
            .await;
        assert_eq!(resp.status(), StatusCode::UNSUPPORTED_MEDIA_TYPE);
        let body: ApiError = test::read_body_json(resp).await;
        assert_eq!(body.error, "Content-Type must be application/json");
    }

    #[actix_web::test]
    async fn test_getting_a_post() {
        let blog = TestBlog::new();
        let post = blog.create("a", "b", "c").await;

        let resp = blog
            .call(test::TestRequest::get().uri(&format!("/api/posts/{}", post.id)))
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let fetched: BlogPost = test::read_body_json(resp).await;
        assert_eq!(fetched, post);

        let resp = blog.call(test::TestRequest::get().uri("/api/posts/99")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: ApiError = test::read_body_json(resp).await;
        assert_eq!(body.error, "There is no post with id 99.");

        let resp = blog.call(test::TestRequest::get().uri("/api/posts/abc")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_updating_a_post() {
        let blog = TestBlog::new();
        let post = blog.create("Hello", "World", "Will").await;

        let resp = blog
            .send_json(
                test::TestRequest::put().uri("/api/posts/1"),
                r#"{"content": "Rust", "id": 500, "colour": "blue"}"#,
            )
            .await;
        assert_eq!(resp.status(), StatusCode::OK);
        let updated: BlogPost = test::read_body_json(resp).await;
        assert_eq!(updated.id, 1);
        assert_eq!(updated.title, "Hello");
        assert_eq!(updated.content, "Rust");
        assert_eq!(updated.author, "Will");
        assert_eq!(updated.created_at, post.created_at);
        assert!(updated.updated_at.is_some());

        let resp = blog
            .send_json(test::TestRequest::put().uri("/api/posts/2"), r#"{"title": "x"}"#)
            .await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
    }

    #[actix_web::test]
    async fn test_deleting_a_post() {
        let blog = TestBlog::new();
        blog.create("a", "b", "c").await;

        let resp = blog.call(test::TestRequest::delete().uri("/api/posts/1")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let body: ApiMessage = test::read_body_json(resp).await;
        assert_eq!(body.message, "Post with id 1 has been deleted successfully.");
        assert!(blog.list("/api/posts").await.is_empty());

        let resp = blog.call(test::TestRequest::delete().uri("/api/posts/1")).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND);
        let body: ApiError = test::read_body_json(resp).await;
        assert_eq!(body.error, "There is no post with id 1.");
    }

    #[actix_web::test]
    async fn test_searching_posts() {
        let blog = TestBlog::new();
        blog.create("Learning Rust", "ownership", "Ann").await;
        blog.create("Rust at work", "traits", "Bob").await;
        blog.create("Gardening", "tomatoes", "Ann").await;

        let hits = blog.list("/api/posts/search?title=RUST").await;
        assert_eq!(hits.len(), 2);

        let hits = blog.list("/api/posts/search?title=rust&author=ann").await;
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].title, "Learning Rust");

        let hits = blog.list("/api/posts/search?colour=blue").await;
        assert_eq!(hits.len(), 3);
    }

    #[actix_web::test]
    async fn test_malformed_query_strings() {
        let blog = TestBlog::new();
        for uri in [
            "/api/posts/search?title=a&title=b",
            "/api/posts?sort=title&sort=author",
        ] {
            let resp = blog.call(test::TestRequest::get().uri(uri)).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
            let body: ApiError = test::read_body_json(resp).await;
            assert!(body.error.starts_with("Invalid query string: "), "{}", body.error);
            assert!(body.error.contains("duplicate field"), "{}", body.error);
        }
    }

    #[actix_web::test]
    async fn test_sorting_posts() {
        let blog = TestBlog::new();
        blog.create("b", "x", "Zed").await;
        blog.create("a", "x", "Amy").await;
        blog.create("c", "x", "amy").await;

        let ids = |posts: Vec<BlogPost>| posts.into_iter().map(|p| p.id).collect::<Vec<_>>();

        // equal keys keep insertion order in both directions
        assert_eq!(ids(blog.list("/api/posts?sort=author").await), [2, 3, 1]);
        assert_eq!(ids(blog.list("/api/posts?sort=author&direction=desc").await), [1, 2, 3]);
        assert_eq!(ids(blog.list("/api/posts?sort=title&direction=desc").await), [3, 1, 2]);
        assert_eq!(ids(blog.list("/api/posts").await), [1, 2, 3]);

        let resp = blog
            .call(test::TestRequest::get().uri("/api/posts?sort=title&direction=up"))
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: ApiError = test::read_body_json(resp).await;
        assert_eq!(body.error, "Invalid sort direction 'up'. Use 'asc' or 'desc'");

        let resp = blog
            .call(test::TestRequest::get().uri("/api/posts?sort=likes"))
            .await;
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        let body: Value = test::read_body_json(resp).await;
        assert!(body["error"].as_str().unwrap().contains("likes"));
    }

    #[actix_web::test]
    async fn test_index_page_lists_posts() {
        let blog = TestBlog::new();
        blog.create("Hello <world>", "Body", "Will").await;

        let resp = blog.call(test::TestRequest::get().uri("/")).await;
        assert_eq!(resp.status(), StatusCode::OK);
        let html = String::from_utf8(test::read_body(resp).await.to_vec()).unwrap();
        assert!(html.contains("Hello &#60;world&#62;"));
        assert!(!html.contains("<world>"));
        assert!(html.contains("by Will on"));
    }
}
