use std::convert::Infallible;

use axum::{
    extract::{Path, Query, State},
    http::Method,
    response::sse::{Event, KeepAlive, Sse},
    routing::get,
    Router,
};
use content_rest_core::events::LiveEvent;
use content_rest_core::pipeline::fetch_clean_content;
use query::QueryParams;
use tokio_stream::wrappers::ReceiverStream;
use tokio_stream::{Stream, StreamExt};

use super::authorize;
use crate::auth::Caller;
use crate::error::ApiResult;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/sse/{content_type}", get(live))
}

/// Removes the subscriber when the client goes away and the stream is dropped.
struct SubscriptionGuard {
    state: AppState,
    content_type: String,
    id: u64,
}

impl Drop for SubscriptionGuard {
    fn drop(&mut self) {
        self.state.registry().unsubscribe(&self.content_type, self.id);
    }
}

/// Stream an `initial` snapshot followed by a `new` event per created item.
/// Only the `where` parameter applies to either.
async fn live(
    State(state): State<AppState>,
    caller: Caller,
    Path(content_type): Path<String>,
    Query(params): Query<QueryParams>,
) -> ApiResult<Sse<impl Stream<Item = Result<Event, Infallible>>>> {
    authorize(&state, &caller, &content_type, &Method::GET).await?;

    let where_clause = params.where_clause.filter(|w| !w.trim().is_empty());
    let subscription = state.registry().subscribe(&content_type, where_clause.clone());
    let guard = SubscriptionGuard {
        state: state.clone(),
        content_type: content_type.clone(),
        id: subscription.id,
    };

    let mut snapshot = fetch_clean_content(state.store(), &content_type, true).await?;
    if let Some(clause) = &where_clause {
        snapshot = query::filter_where(snapshot, clause);
    }

    let stream = tokio_stream::once(LiveEvent::Initial(snapshot))
        .chain(ReceiverStream::new(subscription.receiver))
        .map(move |event| {
            let _live = &guard;
            Ok(to_sse_event(&event))
        });

    Ok(Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(state.config().live_heartbeat)
            .text("heartbeat"),
    ))
}

fn to_sse_event(event: &LiveEvent) -> Event {
    Event::default()
        .event(event.event_name())
        .data(event.payload().to_string())
}
