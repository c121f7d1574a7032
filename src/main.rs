//! SaaS Updates Tracker: binary entrypoint
//! Boots the Axum HTTP server serving `/api/updates`, `/api/sources`,
//! `/health` and `/metrics`.

use shuttle_axum::ShuttleAxum;

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    updates_tracker::init_tracing();

    let router = updates_tracker::app().await?;

    Ok(router.into())
}
