//! Network clients: the live feed WebSocket and the reference-data REST API

pub mod feed_ws;
pub mod reference_api;

pub use feed_ws::{
    build_feed_client, feed_url, handle_client_event, FeedHandler, FeedRoute, FeedRouter,
    PONG_MESSAGE,
};
pub use reference_api::{ReferenceApiError, ReferenceSource, RestReferenceClient};
