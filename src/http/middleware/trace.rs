//! Request tracing middleware.
//!
//! Outermost link of the chain: every response, including ones produced by
//! inner layers (timeouts, rate limiting), carries the correlation and
//! timing headers and is counted exactly once.

use std::convert::Infallible;
use std::sync::Arc;

use axum::{
    body::Body,
    extract::State,
    http::Request,
    middleware::Next,
    response::Response,
};

use crate::observability::{RequestDescriptor, RequestTracer};

pub async fn trace_requests(
    State(tracer): State<Arc<RequestTracer>>,
    request: Request<Body>,
    next: Next,
) -> Response {
    let descriptor = RequestDescriptor::from_request(&request);

    let result = tracer
        .trace(descriptor, |ctx| async move {
            let mut request = request;
            request.extensions_mut().insert(ctx.correlation_id);
            Ok::<_, Infallible>(next.run(request).await)
        })
        .await;

    match result {
        Ok(response) => response,
        Err(never) => match never {},
    }
}
