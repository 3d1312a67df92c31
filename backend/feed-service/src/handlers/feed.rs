/// Feed handlers - HTTP endpoints for post operations
use crate::error::{AppError, Result};
use crate::images::UploadForm;
use crate::middleware::AuthenticatedUser;
use crate::models::{Creator, Post};
use crate::validators::{self, PostInput};
use crate::AppState;
use actix_multipart::Multipart;
use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PostsResponse {
    pub message: &'static str,
    pub posts: Vec<Post>,
    pub total_items: i64,
}

#[derive(Debug, Serialize)]
pub struct PostResponse {
    pub message: &'static str,
    pub post: Post,
}

#[derive(Debug, Serialize)]
pub struct CreatedPostResponse {
    pub message: &'static str,
    pub post: Post,
    pub creator: Creator,
}

/// Malformed ids cannot name a post
fn parse_post_id(raw: &str) -> Result<Uuid> {
    Uuid::parse_str(raw).map_err(|_| AppError::post_not_found())
}

/// GET /feed/posts?page=N
pub async fn get_posts(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
    query: web::Query<PageQuery>,
) -> Result<HttpResponse> {
    let page = state.posts.list(query.page).await?;

    Ok(HttpResponse::Ok().json(PostsResponse {
        message: "Fetched posts successfully",
        posts: page.posts,
        total_items: page.total_items,
    }))
}

/// POST /feed/post (multipart: title, content, image)
pub async fn create_post(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    payload: Multipart,
) -> Result<HttpResponse> {
    let form = UploadForm::read(payload, &state.images).await?;
    let input = PostInput::new(form.text("title"), form.text("content"));
    let uploaded = form.image.clone();

    match state.posts.create(user.0, input, form.image).await {
        Ok((post, creator)) => Ok(HttpResponse::Created().json(CreatedPostResponse {
            message: "Post created successfully",
            post,
            creator,
        })),
        Err(e) => {
            if let Some(path) = uploaded {
                state.images.clear_image(&path).await;
            }
            Err(e)
        }
    }
}

/// GET /feed/post/{id}
pub async fn get_post(
    state: web::Data<AppState>,
    _user: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let post_id = parse_post_id(&path)?;
    let post = state.posts.get(post_id).await?;

    Ok(HttpResponse::Ok().json(PostResponse {
        message: "Post fetched.",
        post,
    }))
}

/// PUT /feed/post/{id} (multipart: title, content, and either an image file
/// or an `image` field holding the current path)
pub async fn update_post(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
    payload: Multipart,
) -> Result<HttpResponse> {
    let post_id = parse_post_id(&path)?;
    let form = UploadForm::read(payload, &state.images).await?;
    let uploaded = form.image.clone();

    match apply_update(&state, user.0, post_id, &form).await {
        Ok(post) => Ok(HttpResponse::Ok().json(PostResponse {
            message: "Post updated!",
            post,
        })),
        Err(e) => {
            if let Some(path) = uploaded {
                state.images.clear_image(&path).await;
            }
            Err(e)
        }
    }
}

/// Input is validated before the image is looked at
async fn apply_update(
    state: &AppState,
    user_id: Uuid,
    post_id: Uuid,
    form: &UploadForm,
) -> Result<Post> {
    let input = PostInput::new(form.text("title"), form.text("content"));
    validators::check(&input)?;

    let image_url = match &form.image {
        Some(path) => path.clone(),
        None => {
            let existing = form.text("image").trim();
            if existing.is_empty() {
                return Err(AppError::invalid("No file picked."));
            }
            existing.to_string()
        }
    };

    state
        .posts
        .update(user_id, post_id, input, Some(image_url))
        .await
}

/// DELETE /feed/post/{id}
pub async fn delete_post(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    path: web::Path<String>,
) -> Result<HttpResponse> {
    let post_id = parse_post_id(&path)?;
    state.posts.delete(user.0, post_id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "Deleted Post" })))
}

/// PUT /post-image (multipart: image, optional oldPath)
///
/// Stores an image for GraphQL clients, which send post data as JSON and
/// reference the returned path.
pub async fn post_image(
    state: web::Data<AppState>,
    user: AuthenticatedUser,
    payload: Multipart,
) -> Result<HttpResponse> {
    let form = UploadForm::read(payload, &state.images).await?;

    let Some(file_path) = form.image.clone() else {
        return Ok(HttpResponse::Ok().json(serde_json::json!({ "message": "No file provided!" })));
    };

    let old_path = form.text("oldPath").trim();
    if !old_path.is_empty() && old_path != file_path {
        state.posts.discard_replaced_image(user.0, old_path).await?;
    }

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "File stored.",
        "filePath": file_path,
    })))
}
