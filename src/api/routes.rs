use crate::api::error::{ApiError, ApiResult};
use crate::api::get_embedded_asset;
use crate::api::multipart::read_upload_form;
use crate::config::Config;
use crate::db::{
    ActivityRecord, Comment, Contact, Interest, NewActivity, NewComment, NewContact, NewInterest,
    NewProfile, NewProject, NewTechStack, Post, Profile, ProfilePatch, Project, RepoResult,
    Repository, TechStack,
};
use crate::heatmap::grid::{HeatmapWindow, bucket_activities};
use crate::heatmap::intensity::{Scheme, ShadeMapper, Theme};
use crate::heatmap::{self, HeatmapView};
use crate::icons::Icon;
use crate::ingest::{IngestPipeline, IngestRequest};
use axum::extract::multipart::MultipartRejection;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::extract::{DefaultBodyLimit, Multipart, Path, Query, State};
use axum::http::{HeaderValue, StatusCode, Uri, header};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, put};
use axum::{Json, Router};
use chrono::{Local, NaiveDate};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

#[derive(Clone)]
pub struct ApiState {
    pub config: Arc<Config>,
    pub repository: Arc<dyn Repository>,
    pub ingest: IngestPipeline,
}

pub fn router(state: ApiState) -> Router {
    let upload_limit = state.config.upload_body_limit();
    let uploads = ServeDir::new(state.ingest.store().public_dir());

    Router::new()
        .route("/api/status", get(status))
        .route(
            "/api/posts",
            get(list_posts)
                .post(create_post)
                .layer(DefaultBodyLimit::max(upload_limit)),
        )
        .route("/api/posts/:id", get(get_post))
        .route("/api/posts/:id/comments", get(list_post_comments))
        .route("/api/profile", get(get_profile).post(create_profile))
        .route("/api/profile/:id", put(update_profile))
        .route("/api/projects", get(list_projects).post(create_project))
        .route("/api/projects/:id", get(get_project))
        .route(
            "/api/tech-stacks",
            get(list_tech_stacks).post(create_tech_stack),
        )
        .route("/api/interests", get(list_interests).post(create_interest))
        .route("/api/activities", get(list_activities).post(create_activity))
        .route("/api/contacts", get(list_contacts).post(create_contact))
        .route("/api/contacts/:id", get(get_contact))
        .route("/api/contacts/:id/mark-as-read", put(mark_contact_read))
        .route("/api/comments", get(list_comments).post(create_comment))
        .route("/api/comments/:id/approve", put(approve_comment))
        .route("/api/heatmap", get(heatmap_view))
        .nest_service("/uploads", uploads)
        .fallback(get(static_assets))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

#[derive(Debug, Serialize)]
struct StatusPayload {
    version: &'static str,
    storage: &'static str,
    posts: usize,
    activities: usize,
}

/// Content card plus the icon kind resolved from its raw icon string.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct WithIcon<T> {
    #[serde(flatten)]
    item: T,
    icon_kind: Icon,
}

impl<T> WithIcon<T> {
    fn new(item: T, icon: Icon) -> Self {
        Self {
            item,
            icon_kind: icon,
        }
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct OwnerQuery {
    owner_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ActivityPayload {
    date: NaiveDate,
    count: u32,
    owner_id: Option<i64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct HeatmapQuery {
    months: Option<u32>,
    to: Option<NaiveDate>,
    theme: Option<Theme>,
    scheme: Option<Scheme>,
    owner_id: Option<i64>,
}

async fn status(State(state): State<ApiState>) -> ApiResult<Json<StatusPayload>> {
    let (posts, activities) = with_repository(&state, |repository| {
        Ok((
            repository.list_posts()?.len(),
            repository.list_activities(None)?.len(),
        ))
    })
    .await?;

    Ok(Json(StatusPayload {
        version: env!("CARGO_PKG_VERSION"),
        storage: state.repository.backend_name(),
        posts,
        activities,
    }))
}

async fn list_posts(State(state): State<ApiState>) -> ApiResult<Json<Vec<Post>>> {
    let posts = with_repository(&state, |repository| repository.list_posts()).await?;
    Ok(Json(posts))
}

async fn create_post(
    State(state): State<ApiState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> ApiResult<(StatusCode, Json<Post>)> {
    let mut multipart = multipart.map_err(|rejection| ApiError::bad_request(rejection.body_text()))?;
    let form = read_upload_form(state.ingest.store(), &mut multipart).await?;

    let post = state
        .ingest
        .ingest(IngestRequest {
            uploads: form.uploads,
            title: form.title,
            owner_id: form.owner_id.unwrap_or(state.config.owner_id),
        })
        .await?;

    Ok((StatusCode::CREATED, Json(post)))
}

async fn get_post(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Post>> {
    let Path(id) = id.map_err(path_error)?;
    with_repository(&state, move |repository| repository.get_post(id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Post not found"))
}

async fn get_profile(State(state): State<ApiState>) -> ApiResult<Json<Profile>> {
    with_repository(&state, |repository| repository.profile())
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Profile not found"))
}

async fn create_profile(
    State(state): State<ApiState>,
    payload: Result<Json<NewProfile>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Profile>)> {
    let Json(profile) = payload?;
    let owner_id = profile.owner_id.unwrap_or(state.config.owner_id);
    let created =
        with_repository(&state, move |repository| repository.create_profile(profile, owner_id))
            .await?;

    Ok((StatusCode::CREATED, Json(created)))
}

async fn update_profile(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
    payload: Result<Json<ProfilePatch>, JsonRejection>,
) -> ApiResult<Json<Profile>> {
    let Path(id) = id.map_err(path_error)?;
    let Json(patch) = payload?;
    let updated =
        with_repository(&state, move |repository| repository.update_profile(id, patch)).await?;

    Ok(Json(updated))
}

async fn list_projects(State(state): State<ApiState>) -> ApiResult<Json<Vec<WithIcon<Project>>>> {
    let projects = with_repository(&state, |repository| repository.list_projects()).await?;
    Ok(Json(
        projects
            .into_iter()
            .map(|project| {
                let icon = project.icon_kind();
                WithIcon::new(project, icon)
            })
            .collect(),
    ))
}

async fn get_project(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<WithIcon<Project>>> {
    let Path(id) = id.map_err(path_error)?;
    let project = with_repository(&state, move |repository| repository.get_project(id))
        .await?
        .ok_or_else(|| ApiError::not_found("Project not found"))?;
    let icon = project.icon_kind();

    Ok(Json(WithIcon::new(project, icon)))
}

async fn create_project(
    State(state): State<ApiState>,
    payload: Result<Json<NewProject>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<WithIcon<Project>>)> {
    let Json(project) = payload?;
    let owner_id = project.owner_id.unwrap_or(state.config.owner_id);
    let created =
        with_repository(&state, move |repository| repository.create_project(project, owner_id))
            .await?;
    let icon = created.icon_kind();

    Ok((StatusCode::CREATED, Json(WithIcon::new(created, icon))))
}

async fn list_tech_stacks(
    State(state): State<ApiState>,
) -> ApiResult<Json<Vec<WithIcon<TechStack>>>> {
    let stacks = with_repository(&state, |repository| repository.list_tech_stacks()).await?;
    Ok(Json(
        stacks
            .into_iter()
            .map(|stack| {
                let icon = stack.icon_kind();
                WithIcon::new(stack, icon)
            })
            .collect(),
    ))
}

async fn create_tech_stack(
    State(state): State<ApiState>,
    payload: Result<Json<NewTechStack>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<WithIcon<TechStack>>)> {
    let Json(stack) = payload?;
    let owner_id = stack.owner_id.unwrap_or(state.config.owner_id);
    let created =
        with_repository(&state, move |repository| repository.create_tech_stack(stack, owner_id))
            .await?;
    let icon = created.icon_kind();

    Ok((StatusCode::CREATED, Json(WithIcon::new(created, icon))))
}

async fn list_interests(State(state): State<ApiState>) -> ApiResult<Json<Vec<WithIcon<Interest>>>> {
    let interests = with_repository(&state, |repository| repository.list_interests()).await?;
    Ok(Json(
        interests
            .into_iter()
            .map(|interest| {
                let icon = interest.icon_kind();
                WithIcon::new(interest, icon)
            })
            .collect(),
    ))
}

async fn create_interest(
    State(state): State<ApiState>,
    payload: Result<Json<NewInterest>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<WithIcon<Interest>>)> {
    let Json(interest) = payload?;
    let owner_id = interest.owner_id.unwrap_or(state.config.owner_id);
    let created =
        with_repository(&state, move |repository| repository.create_interest(interest, owner_id))
            .await?;
    let icon = created.icon_kind();

    Ok((StatusCode::CREATED, Json(WithIcon::new(created, icon))))
}

async fn list_activities(
    State(state): State<ApiState>,
    query: Result<Query<OwnerQuery>, QueryRejection>,
) -> ApiResult<Json<Vec<ActivityRecord>>> {
    let Query(query) = query?;
    let records =
        with_repository(&state, move |repository| repository.list_activities(query.owner_id))
            .await?;

    Ok(Json(records))
}

async fn create_activity(
    State(state): State<ApiState>,
    payload: Result<Json<ActivityPayload>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<ActivityRecord>)> {
    let Json(payload) = payload?;
    let activity = NewActivity {
        date: payload.date,
        count: payload.count,
        owner_id: payload.owner_id.unwrap_or(state.config.owner_id),
    };
    let created =
        with_repository(&state, move |repository| repository.create_activity(activity)).await?;

    Ok((StatusCode::CREATED, Json(created)))
}

async fn list_contacts(State(state): State<ApiState>) -> ApiResult<Json<Vec<Contact>>> {
    let contacts = with_repository(&state, |repository| repository.list_contacts()).await?;
    Ok(Json(contacts))
}

async fn get_contact(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Contact>> {
    let Path(id) = id.map_err(path_error)?;
    with_repository(&state, move |repository| repository.get_contact(id))
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("Contact not found"))
}

async fn create_contact(
    State(state): State<ApiState>,
    payload: Result<Json<NewContact>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Contact>)> {
    let Json(contact) = payload?;
    let created =
        with_repository(&state, move |repository| repository.create_contact(contact)).await?;

    Ok((StatusCode::CREATED, Json(created)))
}

async fn mark_contact_read(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Contact>> {
    let Path(id) = id.map_err(path_error)?;
    let contact =
        with_repository(&state, move |repository| repository.mark_contact_read(id)).await?;

    Ok(Json(contact))
}

async fn list_comments(State(state): State<ApiState>) -> ApiResult<Json<Vec<Comment>>> {
    let comments = with_repository(&state, |repository| repository.list_comments()).await?;
    Ok(Json(comments))
}

async fn list_post_comments(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Vec<Comment>>> {
    let Path(post_id) = id.map_err(path_error)?;
    let comments = with_repository(&state, move |repository| {
        repository
            .get_post(post_id)?
            .map(|_| repository.list_post_comments(post_id))
            .transpose()
    })
    .await?
    .ok_or_else(|| ApiError::not_found("Post not found"))?;

    Ok(Json(comments))
}

async fn create_comment(
    State(state): State<ApiState>,
    payload: Result<Json<NewComment>, JsonRejection>,
) -> ApiResult<(StatusCode, Json<Comment>)> {
    let Json(comment) = payload?;
    let created =
        with_repository(&state, move |repository| repository.create_comment(comment)).await?;

    Ok((StatusCode::CREATED, Json(created)))
}

async fn approve_comment(
    State(state): State<ApiState>,
    id: Result<Path<i64>, PathRejection>,
) -> ApiResult<Json<Comment>> {
    let Path(id) = id.map_err(path_error)?;
    let comment = with_repository(&state, move |repository| repository.approve_comment(id)).await?;

    Ok(Json(comment))
}

async fn heatmap_view(
    State(state): State<ApiState>,
    query: Result<Query<HeatmapQuery>, QueryRejection>,
) -> ApiResult<Json<HeatmapView>> {
    let Query(query) = query?;
    let months = query
        .months
        .unwrap_or(state.config.heatmap_months)
        .clamp(1, 24);
    let end = query.to.unwrap_or_else(|| Local::now().date_naive());
    let owner_id = query.owner_id.unwrap_or(state.config.owner_id);

    let records =
        with_repository(&state, move |repository| repository.list_activities(Some(owner_id)))
            .await?;

    let window = HeatmapWindow::trailing_months(end, months);
    let grid = bucket_activities(window, &records);
    let mapper = ShadeMapper {
        scheme: query.scheme.unwrap_or_default(),
        theme: query.theme.unwrap_or_default(),
        max_expected: state.config.heatmap_max_expected_count,
    };

    Ok(Json(heatmap::render(&grid, &mapper)))
}

async fn static_assets(uri: Uri) -> ApiResult<Response> {
    let path = uri.path();
    if path.starts_with("/api/") {
        return Err(ApiError::not_found("Route not found"));
    }

    match get_embedded_asset(path) {
        Some((bytes, mime)) => {
            let mut response = Response::new(bytes.into_response().into_body());
            response
                .headers_mut()
                .insert(header::CONTENT_TYPE, HeaderValue::from_str(&mime)?);
            Ok(response)
        }
        None => Err(ApiError::not_found("Static asset not found")),
    }
}

/// Runs a repository call on the blocking pool.
async fn with_repository<T, F>(state: &ApiState, work: F) -> ApiResult<T>
where
    T: Send + 'static,
    F: FnOnce(&dyn Repository) -> RepoResult<T> + Send + 'static,
{
    let repository = Arc::clone(&state.repository);
    let result = tokio::task::spawn_blocking(move || work(repository.as_ref()))
        .await
        .map_err(|error| ApiError::Internal(error.into()))?;

    Ok(result?)
}

fn path_error(rejection: PathRejection) -> ApiError {
    ApiError::bad_request(rejection.body_text())
}

#[cfg(test)]
mod tests {
    use super::{ApiState, router};
    use crate::config::{Config, StorageBackend};
    use crate::db::testing::FailingPosts;
    use crate::db::{MemoryRepository, NewActivity, Repository};
    use crate::ingest::IngestPipeline;
    use crate::ingest::staging::UploadStore;
    use axum::Router;
    use axum::body::{Body, to_bytes};
    use axum::http::{Method, Request, StatusCode, header};
    use chrono::NaiveDate;
    use serde_json::{Value, json};
    use std::path::Path;
    use std::sync::Arc;
    use tempfile::TempDir;
    use tower::ServiceExt;

    const BOUNDARY: &str = "folio-test-boundary";

    struct TestApp {
        _dir: TempDir,
        config: Arc<Config>,
        repository: Arc<dyn Repository>,
        app: Router,
    }

    fn test_app(repository: Arc<dyn Repository>) -> TestApp {
        let dir = TempDir::new().expect("tempdir");
        let config = Arc::new(Config {
            storage: StorageBackend::Memory,
            db_path: dir.path().join("db").join("folio.db"),
            upload_dir: dir.path().join("uploads"),
            staging_dir: dir.path().join("staging"),
            max_upload_bytes: 64,
            ..Config::default()
        });
        let store = Arc::new(UploadStore::from_config(&config));
        let state = ApiState {
            config: Arc::clone(&config),
            repository: Arc::clone(&repository),
            ingest: IngestPipeline::new(Arc::clone(&repository), store),
        };

        TestApp {
            _dir: dir,
            config,
            repository,
            app: router(state),
        }
    }

    fn file_part(field: &str, file_name: &str, mime: &str, content: &str) -> String {
        format!(
            "--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"; filename=\"{file_name}\"\r\nContent-Type: {mime}\r\n\r\n{content}\r\n"
        )
    }

    fn text_part(field: &str, value: &str) -> String {
        format!("--{BOUNDARY}\r\nContent-Disposition: form-data; name=\"{field}\"\r\n\r\n{value}\r\n")
    }

    fn multipart_request(parts: &[String]) -> Request<Body> {
        let body = format!("{}--{BOUNDARY}--\r\n", parts.concat());
        Request::builder()
            .method(Method::POST)
            .uri("/api/posts")
            .header(
                header::CONTENT_TYPE,
                format!("multipart/form-data; boundary={BOUNDARY}"),
            )
            .body(Body::from(body))
            .expect("request should build")
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("request should build")
    }

    fn post_json(uri: &str, body: Value) -> Request<Body> {
        Request::builder()
            .method(Method::POST)
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request should build")
    }

    async fn send(app: &Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app
            .clone()
            .oneshot(request)
            .await
            .expect("router should respond");
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body should read");
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        (status, value)
    }

    fn entries(path: &Path) -> usize {
        std::fs::read_dir(path).map(|dir| dir.count()).unwrap_or(0)
    }

    #[tokio::test]
    async fn upload_creates_post_and_lists_it() {
        let test = test_app(Arc::new(MemoryRepository::new()));
        let request = multipart_request(&[file_part(
            "md",
            "hello.md",
            "text/markdown",
            "# Hello World\nBody text",
        )]);

        let (status, body) = send(&test.app, request).await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["title"], "Hello World");
        assert_eq!(body["imageUrl"], Value::Null);
        assert_eq!(body["ownerId"], 1);

        let id = body["id"].as_i64().expect("id");
        let (status, fetched) = send(&test.app, get(&format!("/api/posts/{id}"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(fetched["content"], "# Hello World\nBody text");

        let (_, list) = send(&test.app, get("/api/posts")).await;
        assert_eq!(list.as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn upload_with_image_is_served_from_uploads() {
        let test = test_app(Arc::new(MemoryRepository::new()));
        let request = multipart_request(&[
            file_part("md", "trip.md", "text/markdown", "# Trip"),
            file_part("image", "Beach Day.png", "image/png", "not-really-png"),
        ]);

        let (status, body) = send(&test.app, request).await;
        assert_eq!(status, StatusCode::CREATED);

        let url = body["imageUrl"].as_str().expect("image url").to_string();
        assert!(url.starts_with("/uploads/beach-day-"), "unexpected url {url}");
        assert!(url.ends_with(".png"));
        assert_eq!(entries(&test.config.staging_dir), 0);

        let response = test
            .app
            .clone()
            .oneshot(get(&url))
            .await
            .expect("router should respond");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[tokio::test]
    async fn image_is_stored_under_its_mime_extension() {
        let test = test_app(Arc::new(MemoryRepository::new()));
        let request = multipart_request(&[
            file_part("md", "trip.md", "text/markdown", "# Trip"),
            file_part("image", "evil.html", "image/png", "<script>alert(1)</script>"),
        ]);

        let (status, body) = send(&test.app, request).await;
        assert_eq!(status, StatusCode::CREATED);

        let url = body["imageUrl"].as_str().expect("image url").to_string();
        assert!(url.starts_with("/uploads/evil-"), "unexpected url {url}");
        assert!(url.ends_with(".png"), "unexpected url {url}");

        let response = test
            .app
            .clone()
            .oneshot(get(&url))
            .await
            .expect("router should respond");
        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response
                .headers()
                .get(header::CONTENT_TYPE)
                .and_then(|value| value.to_str().ok()),
            Some("image/png")
        );
    }

    #[tokio::test]
    async fn txt_upload_is_rejected_without_leftovers() {
        let test = test_app(Arc::new(MemoryRepository::new()));
        let request = multipart_request(&[file_part("md", "notes.txt", "text/plain", "hi")]);

        let (status, body) = send(&test.app, request).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"]["field"], "md");
        assert_eq!(entries(&test.config.staging_dir), 0);
        assert_eq!(entries(&test.config.upload_dir), 0);
    }

    #[tokio::test]
    async fn oversized_file_returns_413() {
        let test = test_app(Arc::new(MemoryRepository::new()));
        let request = multipart_request(&[file_part(
            "md",
            "long.md",
            "text/markdown",
            &"x".repeat(200),
        )]);

        let (status, body) = send(&test.app, request).await;

        assert_eq!(status, StatusCode::PAYLOAD_TOO_LARGE);
        assert!(body["message"].as_str().is_some());
        assert_eq!(entries(&test.config.staging_dir), 0);
    }

    #[tokio::test]
    async fn unknown_field_and_missing_markdown_are_bad_requests() {
        let test = test_app(Arc::new(MemoryRepository::new()));

        let (status, body) = send(
            &test.app,
            multipart_request(&[file_part("attachment", "a.md", "text/markdown", "# A")]),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"]["field"], "attachment");

        let (status, body) = send(&test.app, multipart_request(&[text_part("title", "Only")])).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"]["reason"], "missing markdown file");
        assert_eq!(entries(&test.config.staging_dir), 0);
    }

    #[tokio::test]
    async fn storage_failure_returns_500_and_cleans_up() {
        let test = test_app(Arc::new(FailingPosts::backend()));
        let request = multipart_request(&[
            file_part("md", "trip.md", "text/markdown", "# Trip"),
            file_part("image", "cover.gif", "image/gif", "gif"),
        ]);

        let (status, body) = send(&test.app, request).await;

        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["message"], "Internal server error");
        assert_eq!(entries(&test.config.staging_dir), 0);
        assert_eq!(entries(&test.config.upload_dir), 0);
    }

    #[tokio::test]
    async fn missing_post_is_404_with_message() {
        let test = test_app(Arc::new(MemoryRepository::new()));

        let (status, body) = send(&test.app, get("/api/posts/42")).await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "message": "Post not found" }));
    }

    #[tokio::test]
    async fn activities_filter_and_feed_the_heatmap() {
        let test = test_app(Arc::new(MemoryRepository::new()));
        let day = |value: &str| NaiveDate::parse_from_str(value, "%Y-%m-%d").expect("date");
        for (date, count, owner_id) in [("2026-03-03", 5, 1), ("2026-03-04", 2, 2)] {
            test.repository
                .create_activity(NewActivity {
                    date: day(date),
                    count,
                    owner_id,
                })
                .expect("activity");
        }

        let (status, body) = send(
            &test.app,
            post_json("/api/activities", json!({ "date": "2026-03-02", "count": 9 })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(body["ownerId"], 1);

        let (_, owned) = send(&test.app, get("/api/activities?ownerId=1")).await;
        assert_eq!(owned.as_array().map(Vec::len), Some(2));
        assert_eq!(owned[0]["date"], "2026-03-02");

        let (status, view) = send(
            &test.app,
            get("/api/heatmap?months=1&to=2026-03-07&theme=dark&ownerId=1"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(view["total"], 14);
        assert_eq!(view["end"], "2026-03-07");
        assert_eq!(view["rows"].as_array().map(Vec::len), Some(7));
    }

    #[tokio::test]
    async fn bad_heatmap_theme_is_rejected() {
        let test = test_app(Arc::new(MemoryRepository::new()));

        let (status, body) = send(&test.app, get("/api/heatmap?theme=neon")).await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().is_some());
    }

    #[tokio::test]
    async fn profile_and_cards_round_trip() {
        let test = test_app(Arc::new(MemoryRepository::new()));

        let (status, _) = send(&test.app, get("/api/profile")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (status, profile) = send(
            &test.app,
            post_json(
                "/api/profile",
                json!({ "name": "Eltrac", "github": "https://github.com/BigCoke233" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);

        let id = profile["id"].as_i64().expect("profile id");
        let response = test
            .app
            .clone()
            .oneshot(
                Request::builder()
                    .method(Method::PUT)
                    .uri(format!("/api/profile/{id}"))
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json!({ "alias": "el" }).to_string()))
                    .expect("request should build"),
            )
            .await
            .expect("router should respond");
        assert_eq!(response.status(), StatusCode::OK);

        let (status, project) = send(
            &test.app,
            post_json(
                "/api/projects",
                json!({
                    "name": "Folio",
                    "description": "Personal site",
                    "icon": "fa-react",
                    "iconBackground": "#61dafb"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(project["iconKind"], "react");
        assert_eq!(project["icon"], "fa-react");

        let (status, body) = send(
            &test.app,
            post_json(
                "/api/interests",
                json!({ "name": " ", "description": "x", "icon": "fa-music" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"]["field"], "name");
    }

    #[tokio::test]
    async fn status_reports_counts() {
        let test = test_app(Arc::new(MemoryRepository::new()));

        let (status, body) = send(&test.app, get("/api/status")).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["storage"], "memory");
        assert_eq!(body["posts"], 0);
    }

    fn put_empty(uri: &str) -> Request<Body> {
        Request::builder()
            .method(Method::PUT)
            .uri(uri)
            .body(Body::empty())
            .expect("request should build")
    }

    #[tokio::test]
    async fn contact_messages_are_stored_and_marked_read() {
        let test = test_app(Arc::new(MemoryRepository::new()));

        let (status, body) = send(
            &test.app,
            post_json(
                "/api/contacts",
                json!({ "name": "Reader", "email": "nope", "subject": "Hi", "message": "Hello" }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"]["field"], "email");

        let (status, contact) = send(
            &test.app,
            post_json(
                "/api/contacts",
                json!({
                    "name": "Reader",
                    "email": "reader@example.com",
                    "subject": "Hi",
                    "message": "Hello"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(contact["isRead"], false);

        let id = contact["id"].as_i64().expect("contact id");
        let (status, read) =
            send(&test.app, put_empty(&format!("/api/contacts/{id}/mark-as-read"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(read["isRead"], true);

        let (_, fetched) = send(&test.app, get(&format!("/api/contacts/{id}"))).await;
        assert_eq!(fetched["isRead"], true);

        let (status, body) = send(&test.app, get("/api/contacts/999")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body, json!({ "message": "Contact not found" }));

        let (status, _) = send(&test.app, put_empty("/api/contacts/999/mark-as-read")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, all) = send(&test.app, get("/api/contacts")).await;
        assert_eq!(all.as_array().map(Vec::len), Some(1));
    }

    #[tokio::test]
    async fn comments_need_a_post_and_can_be_approved() {
        let test = test_app(Arc::new(MemoryRepository::new()));
        let (_, post) = send(
            &test.app,
            multipart_request(&[file_part("md", "trip.md", "text/markdown", "# Trip")]),
        )
        .await;
        let post_id = post["id"].as_i64().expect("post id");

        let (status, body) = send(
            &test.app,
            post_json(
                "/api/comments",
                json!({
                    "postId": post_id + 50,
                    "name": "Reader",
                    "email": "reader@example.com",
                    "content": "Lovely"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["details"]["field"], "postId");

        let (status, comment) = send(
            &test.app,
            post_json(
                "/api/comments",
                json!({
                    "postId": post_id,
                    "name": "Reader",
                    "email": "reader@example.com",
                    "content": "Lovely"
                }),
            ),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(comment["isApproved"], false);

        let id = comment["id"].as_i64().expect("comment id");
        let (status, approved) =
            send(&test.app, put_empty(&format!("/api/comments/{id}/approve"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(approved["isApproved"], true);

        let (status, listed) =
            send(&test.app, get(&format!("/api/posts/{post_id}/comments"))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(listed.as_array().map(Vec::len), Some(1));
        assert_eq!(listed[0]["postId"], post_id);

        let (status, body) = send(&test.app, get("/api/posts/999/comments")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["message"], "Post not found");

        let (status, _) = send(&test.app, put_empty("/api/comments/999/approve")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);

        let (_, all) = send(&test.app, get("/api/comments")).await;
        assert_eq!(all.as_array().map(Vec::len), Some(1));
    }
}
