use axum::{Router, middleware};
use tower_http::trace::TraceLayer;

use crate::{
    AppState,
    handler::{
        admin::admin_handler, article::article_handler, auth::auth_handler,
        engagement::engagement_handler, reader::reader_handler, subscriber::subscriber_handler,
    },
    middleware::{admin_guard, reader_guard, writer_guard},
};

pub fn create_router(app_state: AppState) -> Router {
    let api_route = Router::new()
        .nest("/auth", auth_handler())
        .merge(subscriber_handler())
        .merge(article_handler())
        // Engagement endpoints live in the reader area: favorites and
        // bookmarks require an eligible reader session.
        .merge(
            engagement_handler()
                .layer(middleware::from_fn_with_state(app_state.clone(), reader_guard)),
        )
        .nest(
            "/reader",
            reader_handler()
                .layer(middleware::from_fn_with_state(app_state.clone(), reader_guard)),
        )
        .nest(
            "/writer",
            crate::handler::writer::writer_handler()
                .layer(middleware::from_fn_with_state(app_state.clone(), writer_guard)),
        )
        .nest(
            "/admin",
            admin_handler()
                .layer(middleware::from_fn_with_state(app_state.clone(), admin_guard)),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(app_state);

    Router::new().nest("/api", api_route)
}
