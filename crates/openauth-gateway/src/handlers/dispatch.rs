//! Catch-all handler that serves requests from the live route table.

use std::collections::HashMap;
use std::net::SocketAddr;

use axum::body::Bytes;
use axum::extract::{ConnectInfo, Query, State};
use axum::http::{HeaderMap, Method, Uri};
use axum::response::{IntoResponse, Response};
use axum::Json;

use openauth_engine::RequestView;

use crate::error::ApiError;
use crate::state::GatewayState;

/// Build a [`RequestView`] from the inbound request and dispatch it.
///
/// The peer address is only available when the server was started with
/// `into_make_service_with_connect_info`.
pub async fn dispatch(
    State(state): State<GatewayState>,
    method: Method,
    uri: Uri,
    headers: HeaderMap,
    connect_info: Option<ConnectInfo<SocketAddr>>,
    query: Option<Query<HashMap<String, String>>>,
    body: Bytes,
) -> Result<Response, ApiError> {
    let mut request = RequestView::new(method, uri.path())
        .with_headers(headers)
        .with_query(query.map(|Query(q)| q).unwrap_or_default())
        .with_body(body);
    if let Some(ConnectInfo(addr)) = connect_info {
        request = request.with_remote_addr(addr);
    }

    let response = state.controller.dispatch(request).await?;
    Ok((response.status, Json(response.body)).into_response())
}
