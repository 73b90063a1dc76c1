use axum::{
    Router,
    routing::{get, post},
};

use crate::handlers;
use crate::state::AppState;

pub fn api_routes() -> Router<AppState> {
    Router::new().nest("/files", file_routes())
}

fn file_routes() -> Router<AppState> {
    let upload = Router::new()
        .route("/", post(handlers::files::upload_file))
        .layer(handlers::files::upload_body_limit());

    Router::new()
        .route("/", get(handlers::files::list_files))
        .route("/storage_stats", get(handlers::files::storage_stats))
        .route("/file_types", get(handlers::files::file_types))
        .route(
            "/{id}",
            get(handlers::files::get_file).delete(handlers::files::delete_file),
        )
        .route("/{id}/download", get(handlers::files::download_file))
        .merge(upload)
}
