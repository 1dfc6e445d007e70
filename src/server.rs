use std::sync::Arc;

use axum::{
    Json, Router,
    extract::{self, rejection::JsonRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use serde::{Deserialize, Serialize};

use crate::{
    hardware::fan::defs::{AccessoryInformation, PowerState},
    identity::IdentityToken,
    platform::{Accessories, Accessory, Origin},
    registry::LookupError,
};

pub struct AppState {
    pub accessories: Accessories,
}

pub fn create_router(accessories: Accessories) -> Router {
    let state = Arc::new(AppState { accessories });

    Router::new()
        .route("/status", get(status))
        .route("/accessories", get(list_accessories))
        .route("/accessories/{id}", get(get_accessory))
        .route("/accessories/{id}/active", get(get_active).put(set_active))
        .with_state(state)
}

/* === Payloads === */

#[derive(Serialize)]
#[serde(tag = "status")]
enum ErrorResponse {
    Error { message: String },
}

#[derive(Debug, Deserialize, Serialize, PartialEq)]
struct ActivePayload {
    value: ActiveValue,
}

/// Either `"on"`/`"off"`, or the numeric form of the `Active` characteristic
/// where zero is off and any other number is on.
#[derive(Debug, Deserialize, Serialize, PartialEq)]
#[serde(untagged)]
enum ActiveValue {
    State(PowerState),
    Numeric(f64),
}

#[derive(Serialize)]
struct AccessoryView<'a> {
    id: &'a str,
    uuid: IdentityToken,
    room: &'a str,
    origin: Origin,
    active: PowerState,
    rotation_speed: u8,
    #[serde(flatten)]
    info: &'a AccessoryInformation,
}

enum ApiError {
    Lookup(LookupError),
    Rejected(JsonRejection),
}

/* === Routes === */

async fn status() -> &'static str {
    "Healthy"
}

async fn list_accessories(extract::State(state): extract::State<Arc<AppState>>) -> Response {
    let views: Vec<_> = state.accessories.iter().map(AccessoryView::from).collect();
    Json(views).into_response()
}

async fn get_accessory(
    extract::State(state): extract::State<Arc<AppState>>,
    extract::Path(id): extract::Path<String>,
) -> Result<Response, ApiError> {
    let accessory = state.accessories.get(&id)?;
    Ok(Json(AccessoryView::from(accessory)).into_response())
}

async fn get_active(
    extract::State(state): extract::State<Arc<AppState>>,
    extract::Path(id): extract::Path<String>,
) -> Result<Json<ActivePayload>, ApiError> {
    let active = state.accessories.get(&id)?.controller.active();
    tracing::debug!("Get characteristic Active for {id} -> {active}");

    Ok(Json(ActivePayload {
        value: ActiveValue::State(active),
    }))
}

/// Responds as soon as the command is dispatched, without waiting on the
/// network.
async fn set_active(
    extract::State(state): extract::State<Arc<AppState>>,
    extract::Path(id): extract::Path<String>,
    payload: Result<Json<ActivePayload>, JsonRejection>,
) -> Result<Json<ActivePayload>, ApiError> {
    let accessory = state.accessories.get(&id)?;
    let Json(payload) = payload?;
    let target = payload.value.state();

    drop(accessory.controller.set_active(target));

    Ok(Json(ActivePayload {
        value: ActiveValue::State(target),
    }))
}

/* === Implementations === */

impl ActiveValue {
    fn state(&self) -> PowerState {
        match self {
            ActiveValue::State(state) => *state,
            ActiveValue::Numeric(value) => PowerState::from(*value != 0.0),
        }
    }
}

impl<'a> From<&'a Accessory> for AccessoryView<'a> {
    fn from(accessory: &'a Accessory) -> Self {
        let record = accessory.controller.record();

        Self {
            id: &record.id,
            uuid: accessory.uuid,
            room: &record.room,
            origin: accessory.origin,
            active: accessory.controller.active(),
            rotation_speed: accessory.controller.rotation_speed(),
            info: &accessory.info,
        }
    }
}

impl From<LookupError> for ApiError {
    fn from(err: LookupError) -> Self {
        ApiError::Lookup(err)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected(rejection)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message) = match self {
            ApiError::Lookup(err @ LookupError::NotFound(_)) => {
                (StatusCode::NOT_FOUND, err.to_string())
            }

            ApiError::Rejected(rejection) => (rejection.status(), rejection.body_text()),
        };

        (status, Json(ErrorResponse::Error { message })).into_response()
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        body::{Body, to_bytes},
        http::{Method, Request},
    };
    use serde_json::{Value, json};
    use tokio::sync::mpsc;
    use tower::ServiceExt;

    use crate::{
        config::Defaults,
        hardware::fan::protocol::mock::RecordingTransport,
        platform::{Platform, cache::AccessoryCache},
        registry::{DeviceRegistry, tests::record},
    };

    use super::*;

    type Datagrams = mpsc::UnboundedReceiver<(std::net::SocketAddr, bytes::Bytes)>;

    fn router() -> (Router, Datagrams) {
        let (transport, rx) = RecordingTransport::new();

        let registry = DeviceRegistry::builder()
            .with_record(record("office_fan", "192.168.0.130", b"ON_BYTES", b"OFF_BYTES"))
            .build()
            .unwrap();

        let platform = Platform::new(registry, Arc::new(transport), Defaults::default());
        let accessories = platform.launch(&mut AccessoryCache::in_memory());

        (create_router(accessories), rx)
    }

    async fn call(
        router: &Router,
        method: Method,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut request = Request::builder().method(method).uri(uri);

        let body = match body {
            Some(json) => {
                request = request.header("content-type", "application/json");
                Body::from(json.to_string())
            }
            None => Body::empty(),
        };

        let response = router
            .clone()
            .oneshot(request.body(body).unwrap())
            .await
            .unwrap();

        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let value = serde_json::from_slice(&bytes).unwrap_or(Value::Null);

        (status, value)
    }

    #[tokio::test]
    async fn test_status() {
        let (router, _rx) = router();
        let (status, _) = call(&router, Method::GET, "/status", None).await;

        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_list_accessories() {
        let (router, _rx) = router();
        let (status, body) = call(&router, Method::GET, "/accessories", None).await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body[0]["id"], "office_fan");
        assert_eq!(body[0]["manufacturer"], "Atomberg");
        assert_eq!(body[0]["model"], "Aria");
        assert_eq!(body[0]["active"], "off");
        assert_eq!(body[0]["origin"], "new");
        assert_eq!(body[0]["rotation_speed"], 40);
    }

    #[tokio::test]
    async fn test_set_then_get_active() {
        let (router, mut rx) = router();

        let (status, body) = call(
            &router,
            Method::PUT,
            "/accessories/office_fan/active",
            Some(json!({ "value": "on" })),
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "value": "on" }));

        let (_, body) = call(&router, Method::GET, "/accessories/office_fan/active", None).await;
        assert_eq!(body, json!({ "value": "on" }));

        let (addr, payload) = rx.recv().await.unwrap();
        assert_eq!(addr.port(), 5600);
        assert_eq!(&payload[..], b"ON_BYTES");
    }

    #[tokio::test]
    async fn test_numeric_active_value() {
        let (router, mut rx) = router();

        let uri = "/accessories/office_fan/active";
        call(&router, Method::PUT, uri, Some(json!({ "value": 1 }))).await;
        let (_, body) = call(&router, Method::PUT, uri, Some(json!({ "value": 0 }))).await;

        assert_eq!(body, json!({ "value": "off" }));

        assert_eq!(&rx.recv().await.unwrap().1[..], b"ON_BYTES");
        assert_eq!(&rx.recv().await.unwrap().1[..], b"OFF_BYTES");

        let (status, body) = call(&router, Method::PUT, uri, Some(json!({ "value": 1000 }))).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, json!({ "value": "on" }));
        assert_eq!(&rx.recv().await.unwrap().1[..], b"ON_BYTES");
    }

    #[tokio::test]
    async fn test_malformed_body_is_json_error() {
        let (router, mut rx) = router();
        let uri = "/accessories/office_fan/active";

        for body in [json!({ "value": "sideways" }), json!({ "state": "on" })] {
            let (status, body) = call(&router, Method::PUT, uri, Some(body)).await;

            assert!(status.is_client_error());
            assert_eq!(body["status"], "Error");
            assert!(body["message"].is_string());
        }

        let (_, body) = call(&router, Method::GET, uri, None).await;
        assert_eq!(body, json!({ "value": "off" }));

        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn test_unknown_device() {
        let (router, mut rx) = router();

        let (status, body) = call(&router, Method::GET, "/accessories/attic_fan", None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["status"], "Error");

        let (status, _) = call(
            &router,
            Method::PUT,
            "/accessories/attic_fan/active",
            Some(json!({ "value": "on" })),
        )
        .await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        tokio::task::yield_now().await;
        assert!(rx.try_recv().is_err());
    }
}
