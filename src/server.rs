// JSON-over-HTTP facade: POST /track/single, /track/batch/ticket,
// /track/batch/result and GET /health
use crate::error::{BoxError, TrackingError};
use crate::masking::mask_json;
use crate::service::TrackingService;
use crate::transport::SoapTransport;
use bytes::Bytes;
use http_body_util::{BodyExt, Full, Limited};
use hyper::header::{HeaderValue, CONTENT_TYPE};
use hyper::server::conn::http1;
use hyper::service::service_fn;
use hyper::{Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::{json, Value};
use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

// Batch submissions can carry thousands of barcodes.
const MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, Deserialize)]
struct SingleTrackRequest {
    #[serde(default)]
    login: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    barcode: String,
}

#[derive(Debug, Deserialize)]
struct BatchTicketRequest {
    #[serde(default)]
    login: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    barcodes: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct BatchResultRequest {
    #[serde(default)]
    login: String,
    #[serde(default)]
    password: String,
    #[serde(default)]
    ticket: String,
}

fn decode<T: DeserializeOwned>(body: &[u8]) -> Result<T, (StatusCode, Value)> {
    serde_json::from_slice(body).map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            json!({"success": false, "error": format!("Malformed JSON body: {e}")}),
        )
    })
}

fn error_response(e: &TrackingError) -> (StatusCode, Value) {
    let status = StatusCode::from_u16(e.status_code()).unwrap_or(StatusCode::BAD_GATEWAY);
    if e.is_not_ready() {
        return (
            status,
            json!({"success": false, "status": "PROCESSING", "message": e.to_string()}),
        );
    }
    (status, json!({"success": false, "error": e.to_string()}))
}

// Routes one request to the service and returns the status and JSON body.
pub async fn dispatch<T: SoapTransport>(
    service: &TrackingService<T>,
    method: &Method,
    path: &str,
    body: &[u8],
) -> (StatusCode, Value) {
    let outcome = match (method, path) {
        (&Method::GET, "/health") => return (StatusCode::OK, json!({"success": true})),
        (&Method::POST, "/track/single") => match decode::<SingleTrackRequest>(body) {
            Ok(req) => service
                .get_single_history(&req.login, &req.password, &req.barcode)
                .await
                .map(|records| json!({"success": true, "data": records})),
            Err(rejection) => return rejection,
        },
        (&Method::POST, "/track/batch/ticket") => match decode::<BatchTicketRequest>(body) {
            Ok(req) => service
                .request_batch_ticket(&req.login, &req.password, &req.barcodes)
                .await
                .map(|ticket| json!({"success": true, "ticket": ticket})),
            Err(rejection) => return rejection,
        },
        (&Method::POST, "/track/batch/result") => match decode::<BatchResultRequest>(body) {
            Ok(req) => service
                .poll_batch_result(&req.login, &req.password, &req.ticket)
                .await
                .map(|result| json!({"success": true, "data": result})),
            Err(rejection) => return rejection,
        },
        _ => {
            return (
                StatusCode::NOT_FOUND,
                json!({"success": false, "error": format!("No route for {method} {path}")}),
            )
        }
    };

    match outcome {
        Ok(value) => (StatusCode::OK, value),
        Err(e) => error_response(&e),
    }
}

fn json_response(status: StatusCode, value: &Value) -> Response<Full<Bytes>> {
    let mut response = Response::new(Full::new(Bytes::from(value.to_string())));
    *response.status_mut() = status;
    response
        .headers_mut()
        .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

async fn handle_request<T: SoapTransport>(
    req: Request<hyper::body::Incoming>,
    service: Arc<TrackingService<T>>,
) -> Result<Response<Full<Bytes>>, Infallible> {
    let method = req.method().clone();
    let path = req.uri().path().to_string();

    let body = match Limited::new(req.into_body(), MAX_BODY_BYTES).collect().await {
        Ok(collected) => collected.to_bytes(),
        Err(e) => {
            warn!(%method, %path, error = %e, "request_body_rejected");
            let value = json!({"success": false, "error": format!("Unreadable request body: {e}")});
            return Ok(json_response(StatusCode::BAD_REQUEST, &value));
        }
    };
    if let Ok(parsed) = serde_json::from_slice::<Value>(&body) {
        debug!(%method, %path, body = %mask_json(&parsed), "http_request");
    }

    let (status, value) = dispatch(&service, &method, &path, &body).await;
    info!(%method, %path, status = status.as_u16(), "http_response");
    Ok(json_response(status, &value))
}

// Accepts connections until `shutdown` flips to true.
pub async fn serve<T: SoapTransport>(
    addr: SocketAddr,
    service: Arc<TrackingService<T>>,
    mut shutdown: watch::Receiver<bool>,
) -> Result<(), BoxError> {
    let listener = TcpListener::bind(addr).await?;
    info!(%addr, "tracking_server_started");

    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, _peer)) => {
                        let io = TokioIo::new(stream);
                        let service = service.clone();

                        tokio::spawn(async move {
                            let handler = service_fn(move |req| {
                                let service = service.clone();
                                async move { handle_request(req, service).await }
                            });

                            if let Err(e) = http1::Builder::new().serve_connection(io, handler).await {
                                error!(error = %e, "http_connection_error");
                            }
                        });
                    }
                    Err(e) => {
                        error!(error = %e, "accept_error");
                    }
                }
            }
            _ = shutdown.changed() => {
                if *shutdown.borrow() {
                    info!("tracking_server_shutdown");
                    return Ok(());
                }
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{NotReadySignals, ServiceKey};
    use crate::parser::samples::*;
    use crate::service::mock_transport::MockTransport;
    use test_case::test_case;

    async fn service_with(key: ServiceKey, body: &str) -> TrackingService<MockTransport> {
        let transport = MockTransport::new();
        transport.respond(key, body).await;
        TrackingService::new(transport, NotReadySignals::default())
    }

    async fn post(service: &TrackingService<MockTransport>, path: &str, body: Value) -> (StatusCode, Value) {
        dispatch(service, &Method::POST, path, body.to_string().as_bytes()).await
    }

    #[tokio::test]
    async fn test_ticket_route() {
        let service = service_with(ServiceKey::Batch, TICKET_RESPONSE).await;
        let (status, body) = post(
            &service,
            "/track/batch/ticket",
            json!({"login": "u", "password": "p", "barcodes": ["1", "2"]}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({"success": true, "ticket": "ABC-123"}));
    }

    #[tokio::test]
    async fn test_result_route_not_ready_is_202() {
        let service = service_with(ServiceKey::Batch, NOT_READY_FAULT).await;
        let (status, body) = post(
            &service,
            "/track/batch/result",
            json!({"login": "u", "password": "p", "ticket": "ABC-123"}),
        )
        .await;
        assert_eq!(status, StatusCode::ACCEPTED);
        assert_eq!(body["success"], false);
        assert_eq!(body["status"], "PROCESSING");
        assert_eq!(body["message"], "Batch results not ready yet.");
    }

    #[tokio::test]
    async fn test_result_route_returns_partition() {
        let service = service_with(ServiceKey::Batch, BATCH_STATUS_RESPONSE).await;
        let (status, body) = post(
            &service,
            "/track/batch/result",
            json!({"login": "u", "password": "p", "ticket": "ABC-123"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["successItems"][0]["barcode"], "1");
        assert_eq!(body["data"]["errorMessages"]["2"], "Barcode not found");
    }

    #[tokio::test]
    async fn test_single_route() {
        let service = service_with(ServiceKey::Single, SINGLE_HISTORY_RESPONSE).await;
        let (status, body) = post(
            &service,
            "/track/single",
            json!({"login": "u", "password": "p", "barcode": "80081234567890"}),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"][0]["barcode"], "80081234567890");
        assert_eq!(body["data"][0]["operationType"]["name"], "Приём");
    }

    #[test_case(json!({"login": "u", "password": "p"}); "missing ticket")]
    #[test_case(json!({"login": "", "password": "p", "ticket": "T"}); "blank login")]
    #[test_case(json!({"login": "u", "password": "p", "ticket": 5}); "wrong type")]
    #[tokio::test]
    async fn test_bad_requests_are_400(payload: Value) {
        let service = service_with(ServiceKey::Batch, BATCH_STATUS_RESPONSE).await;
        let (status, body) = post(&service, "/track/batch/result", payload).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["error"].is_string());
    }

    #[tokio::test]
    async fn test_malformed_json_is_400() {
        let service = service_with(ServiceKey::Single, SINGLE_HISTORY_RESPONSE).await;
        let (status, _) = dispatch(&service, &Method::POST, "/track/single", b"{not json").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let service = service_with(ServiceKey::Single, SINGLE_HISTORY_RESPONSE).await;
        let (status, _) = dispatch(&service, &Method::GET, "/track/single", b"").await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[test_case(TrackingError::api(502, "API Error: Invalid login"), StatusCode::BAD_GATEWAY; "api")]
    #[test_case(TrackingError::parsing("bad"), StatusCode::INTERNAL_SERVER_ERROR; "parsing")]
    #[test_case(TrackingError::Timeout(100), StatusCode::GATEWAY_TIMEOUT; "timeout")]
    #[test_case(TrackingError::Transport("refused".into()), StatusCode::SERVICE_UNAVAILABLE; "transport")]
    fn test_error_status_mapping(error: TrackingError, expected: StatusCode) {
        let (status, body) = error_response(&error);
        assert_eq!(status, expected);
        assert_eq!(body["error"], error.to_string());
    }

    #[tokio::test]
    async fn test_carrier_fault_reaches_client() {
        let fault = r#"<S:Envelope xmlns:S="urn:s"><S:Body><S:Fault><faultcode>S:Client</faultcode><faultstring>Invalid login</faultstring></S:Fault></S:Body></S:Envelope>"#;
        let service = service_with(ServiceKey::Batch, fault).await;
        let (status, body) = post(
            &service,
            "/track/batch/ticket",
            json!({"login": "u", "password": "p", "barcodes": ["1"]}),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body["error"], "API Error: Invalid login");
    }
}
