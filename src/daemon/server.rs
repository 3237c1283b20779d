use crate::core::sink::TransportFaults;
use crate::daemon::agent::PollingAgent;
use crate::ingest::IngestEndpoint;
use serde::Serialize;
use std::convert::Infallible;
use std::sync::Arc;
use warp::http::StatusCode;
use warp::Filter;

#[derive(Serialize)]
struct SubmitResponse {
    accepted: usize,
}

#[derive(Serialize)]
struct ErrorResponse {
    error: String,
}

#[derive(Serialize)]
struct StatusResponse {
    polling_enabled: bool,
    transport_failures: u64,
}

fn with<T: Clone + Send>(value: T) -> impl Filter<Extract = (T,), Error = Infallible> + Clone {
    warp::any().map(move || value.clone())
}

/// `POST /criteria` — submit a JSON batch; answers with the accepted count or
/// the rejection reason, so callers can tell the two apart.
/// `GET /status` — operational snapshot of the polling agent.
pub fn routes(
    endpoint: Arc<IngestEndpoint>,
    agent: Arc<PollingAgent>,
    faults: Arc<TransportFaults>,
) -> impl Filter<Extract = (impl warp::Reply,), Error = warp::Rejection> + Clone {
    let submit = warp::post()
        .and(warp::path("criteria"))
        .and(warp::path::end())
        .and(warp::body::bytes())
        .and(with(endpoint))
        .map(
            |body: warp::hyper::body::Bytes, endpoint: Arc<IngestEndpoint>| match endpoint
                .submit(&body)
            {
                Ok(accepted) => warp::reply::with_status(
                    warp::reply::json(&SubmitResponse { accepted }),
                    StatusCode::OK,
                ),
                Err(e) => {
                    tracing::warn!(error = %e, "Rejected criteria submission");
                    warp::reply::with_status(
                        warp::reply::json(&ErrorResponse {
                            error: e.to_string(),
                        }),
                        StatusCode::BAD_REQUEST,
                    )
                }
            },
        );

    let status = warp::get()
        .and(warp::path("status"))
        .and(warp::path::end())
        .and(with(agent))
        .and(with(faults))
        .and_then(
            |agent: Arc<PollingAgent>, faults: Arc<TransportFaults>| async move {
                Ok::<_, warp::Rejection>(warp::reply::json(&StatusResponse {
                    polling_enabled: agent.is_enabled().await,
                    transport_failures: faults.count(),
                }))
            },
        );

    submit.or(status)
}
