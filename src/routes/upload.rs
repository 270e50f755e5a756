//! Upload routes
//!
//! Both handlers take `AuthUser` ahead of the body, so an anonymous request
//! is redirected before any multipart data is read.

use axum::{
    extract::{Multipart, State},
    response::Html,
    routing::get,
    Router,
};

use crate::auth::AuthUser;
use crate::error::Result;
use crate::state::AppState;
use crate::templates::Flash;

/// Multipart field carrying the file
const FILE_FIELD: &str = "file";

/// Create the upload router
pub fn router() -> Router<AppState> {
    Router::new().route("/upload", get(upload_page).post(upload))
}

/// GET /upload
async fn upload_page(State(state): State<AppState>, user: AuthUser) -> Result<Html<String>> {
    Ok(Html(state.templates().upload(&user.username, &[])?))
}

/// POST /upload
///
/// Stores the first usable `file` part. A missing part or an empty/unusable
/// file name just redisplays the form.
async fn upload(
    State(state): State<AppState>,
    user: AuthUser,
    mut multipart: Multipart,
) -> Result<Html<String>> {
    let mut flashes = Vec::new();

    while let Some(field) = multipart.next_field().await? {
        if field.name() != Some(FILE_FIELD) {
            continue;
        }

        let file_name = match field.file_name() {
            Some(name) if !name.is_empty() => name.to_owned(),
            _ => continue,
        };

        let data = field.bytes().await?;
        match state.uploads().save(&file_name, &data).await? {
            Some(stored) => {
                tracing::info!(
                    username = %user.username,
                    file_name = %stored.name,
                    size = stored.size,
                    "File stored"
                );
                flashes.push(Flash::success("File uploaded successfully"));
            }
            None => {
                tracing::debug!(file_name = %file_name, "Nothing usable left of file name, skipping");
            }
        }
        break;
    }

    Ok(Html(state.templates().upload(&user.username, &flashes)?))
}
