//! Landing routes.

use axum::response::sse::{Event, Sse};
use std::convert::Infallible;

pub async fn root() -> &'static str {
    "Hello World!"
}

/// Landing route after login; a single server-sent event.
pub async fn hello() -> Sse<tokio_stream::Once<Result<Event, Infallible>>> {
    Sse::new(tokio_stream::once(Ok(Event::default().data("world"))))
}
