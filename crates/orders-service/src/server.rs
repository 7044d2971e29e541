//! HTTP server for the orders API.
//!
//! Routes, middleware and the translation between axum extractors and the
//! order handlers in [`crate::apis::order`].

use axum::{
	extract::{
		rejection::{JsonRejection, PathRejection},
		DefaultBodyLimit, Path, State,
	},
	http::{HeaderName, HeaderValue, Method, StatusCode},
	response::Json,
	routing::get,
	Router,
};
use orders_config::{ApiConfig, CorsConfig};
use orders_storage::StorageService;
use orders_types::{APIError, IssueDetail, OrderResponse};
use serde_json::Value;
use std::{future::Future, sync::Arc, time::Duration};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
	cors::{AllowOrigin, Any, CorsLayer},
	timeout::TimeoutLayer,
	trace::TraceLayer,
};

/// Shared application state for the API server.
#[derive(Clone)]
pub struct AppState {
	/// Handle to the opened order store.
	pub storage: Arc<StorageService>,
}

/// Builds the router with every order route and the configured middleware.
///
/// The collection is served both with and without a trailing slash.
pub fn build_router(state: AppState, api_config: &ApiConfig) -> Router {
	Router::new()
		.route(
			"/orders",
			get(handle_list_orders).post(handle_create_order),
		)
		.route(
			"/orders/",
			get(handle_list_orders).post(handle_create_order),
		)
		.route(
			"/orders/{order_id}",
			get(handle_get_order)
				.put(handle_update_order)
				.delete(handle_delete_order),
		)
		.layer(
			ServiceBuilder::new()
				.layer(TraceLayer::new_for_http())
				.layer(cors_layer(api_config.cors.as_ref()))
				.layer(timeout_layer(Duration::from_secs(
					api_config.timeout_seconds,
				)))
				.layer(DefaultBodyLimit::max(api_config.max_request_size)),
		)
		.with_state(state)
}

/// Requests running longer than `timeout` are answered with 408.
fn timeout_layer(timeout: Duration) -> TimeoutLayer {
	TimeoutLayer::with_status_code(StatusCode::REQUEST_TIMEOUT, timeout)
}

fn cors_layer(cors: Option<&CorsConfig>) -> CorsLayer {
	let Some(cors) = cors else {
		return CorsLayer::permissive();
	};

	let origins = if cors.allowed_origins.iter().any(|origin| origin == "*") {
		AllowOrigin::any()
	} else {
		let origins: Vec<HeaderValue> = cors
			.allowed_origins
			.iter()
			.filter_map(|origin| match origin.parse() {
				Ok(value) => Some(value),
				Err(_) => {
					tracing::warn!(%origin, "Ignoring invalid CORS origin");
					None
				},
			})
			.collect();
		AllowOrigin::list(origins)
	};

	let mut layer = CorsLayer::new().allow_origin(origins);

	if cors.allowed_methods.is_empty() {
		layer = layer.allow_methods([Method::GET, Method::POST, Method::PUT, Method::DELETE]);
	} else {
		let methods: Vec<Method> = cors
			.allowed_methods
			.iter()
			.filter_map(|method| Method::from_bytes(method.to_uppercase().as_bytes()).ok())
			.collect();
		layer = layer.allow_methods(methods);
	}

	if cors.allowed_headers.is_empty() {
		layer = layer.allow_headers(Any);
	} else {
		let headers: Vec<HeaderName> = cors
			.allowed_headers
			.iter()
			.filter_map(|header| header.parse().ok())
			.collect();
		layer = layer.allow_headers(headers);
	}

	layer
}

/// Starts the HTTP server for the API.
///
/// Binds the configured address and serves until `shutdown` resolves.
pub async fn start_server(
	api_config: ApiConfig,
	storage: Arc<StorageService>,
	shutdown: impl Future<Output = ()> + Send + 'static,
) -> Result<(), Box<dyn std::error::Error>> {
	let app = build_router(AppState { storage }, &api_config);

	let bind_address = format!("{}:{}", api_config.host, api_config.port);
	let listener = TcpListener::bind(&bind_address).await?;

	tracing::info!("Orders API server starting on {}", bind_address);

	serve(listener, app, shutdown).await?;

	tracing::info!("Orders API server stopped");
	Ok(())
}

/// Serves `app` on an already bound listener until `shutdown` resolves.
pub async fn serve(
	listener: TcpListener,
	app: Router,
	shutdown: impl Future<Output = ()> + Send + 'static,
) -> std::io::Result<()> {
	axum::serve(listener, app)
		.with_graceful_shutdown(shutdown)
		.await
}

fn body_rejection(rejection: JsonRejection) -> APIError {
	tracing::warn!("Rejected request body: {}", rejection.body_text());
	APIError::BadRequest {
		message: rejection.body_text(),
	}
}

fn path_rejection(rejection: PathRejection) -> APIError {
	tracing::warn!("Rejected order id: {}", rejection.body_text());
	APIError::UnprocessableEntity {
		issues: vec![IssueDetail {
			loc: vec!["path".to_string(), "order_id".to_string()],
			msg: "Input should be a valid integer, unable to parse string as an integer"
				.to_string(),
			error_type: "int_parsing".to_string(),
		}],
	}
}

/// Handles POST /orders requests.
async fn handle_create_order(
	State(state): State<AppState>,
	payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<OrderResponse>, APIError> {
	let Json(body) = payload.map_err(body_rejection)?;
	match crate::apis::order::create_order(&state.storage, &body).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!("Order creation failed: {}", e);
			Err(APIError::from(e))
		},
	}
}

/// Handles GET /orders requests.
async fn handle_list_orders(
	State(state): State<AppState>,
) -> Result<Json<Vec<OrderResponse>>, APIError> {
	match crate::apis::order::list_orders(&state.storage).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!("Order listing failed: {}", e);
			Err(APIError::from(e))
		},
	}
}

/// Handles GET /orders/{order_id} requests.
async fn handle_get_order(
	State(state): State<AppState>,
	order_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<OrderResponse>, APIError> {
	let Path(order_id) = order_id.map_err(path_rejection)?;
	match crate::apis::order::get_order(&state.storage, order_id).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!("Order retrieval failed: {}", e);
			Err(APIError::from(e))
		},
	}
}

/// Handles PUT /orders/{order_id} requests.
async fn handle_update_order(
	State(state): State<AppState>,
	order_id: Result<Path<i64>, PathRejection>,
	payload: Result<Json<Value>, JsonRejection>,
) -> Result<Json<OrderResponse>, APIError> {
	let Path(order_id) = order_id.map_err(path_rejection)?;
	let Json(body) = payload.map_err(body_rejection)?;
	match crate::apis::order::update_order(&state.storage, order_id, &body).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!("Order update failed: {}", e);
			Err(APIError::from(e))
		},
	}
}

/// Handles DELETE /orders/{order_id} requests.
async fn handle_delete_order(
	State(state): State<AppState>,
	order_id: Result<Path<i64>, PathRejection>,
) -> Result<Json<OrderResponse>, APIError> {
	let Path(order_id) = order_id.map_err(path_rejection)?;
	match crate::apis::order::delete_order(&state.storage, order_id).await {
		Ok(response) => Ok(Json(response)),
		Err(e) => {
			tracing::warn!("Order deletion failed: {}", e);
			Err(APIError::from(e))
		},
	}
}

#[cfg(test)]
mod tests {
	use super::*;
	use axum::{
		body::{to_bytes, Body},
		http::{header, Request, StatusCode},
	};
	use orders_storage::implementations::memory::MemoryStorage;
	use orders_types::initial_orders;
	use serde_json::json;
	use tower::ServiceExt;

	async fn test_app() -> Router {
		let storage = StorageService::open(Box::new(MemoryStorage::new()))
			.await
			.unwrap();
		storage.seed_if_empty(initial_orders()).await.unwrap();
		build_router(
			AppState {
				storage: Arc::new(storage),
			},
			&ApiConfig::default(),
		)
	}

	async fn send(
		app: &Router,
		method: Method,
		uri: &str,
		body: Option<&str>,
	) -> (StatusCode, Value) {
		let mut request = Request::builder().method(method).uri(uri);
		let body = match body {
			Some(text) => {
				request = request.header(header::CONTENT_TYPE, "application/json");
				Body::from(text.to_string())
			},
			None => Body::empty(),
		};
		let response = app
			.clone()
			.oneshot(request.body(body).unwrap())
			.await
			.unwrap();
		let status = response.status();
		let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
		let value = if bytes.is_empty() {
			Value::Null
		} else {
			serde_json::from_slice(&bytes).unwrap()
		};
		(status, value)
	}

	#[tokio::test]
	async fn test_list_with_and_without_trailing_slash() {
		let app = test_app().await;

		let (status, plain) = send(&app, Method::GET, "/orders", None).await;
		assert_eq!(status, StatusCode::OK);
		let (status, slashed) = send(&app, Method::GET, "/orders/", None).await;
		assert_eq!(status, StatusCode::OK);
		assert_eq!(plain, slashed);
		assert_eq!(
			plain,
			json!([
				{ "id": 1, "product_name": "Product A", "quantity": 10 },
				{ "id": 2, "product_name": "Product B", "quantity": 5 },
				{ "id": 3, "product_name": "Product C", "quantity": 20 },
			])
		);
	}

	#[tokio::test]
	async fn test_create_validation_error_shape() {
		let app = test_app().await;

		let (status, body) = send(
			&app,
			Method::POST,
			"/orders/",
			Some(r#"{"product_name": "Bad", "quantity": 0}"#),
		)
		.await;
		assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
		let detail = body["detail"].as_array().unwrap();
		assert_eq!(detail.len(), 1);
		assert_eq!(detail[0]["loc"], json!(["body", "quantity"]));
		assert_eq!(detail[0]["type"], "value_error");
	}

	#[tokio::test]
	async fn test_malformed_json_is_bad_request() {
		let app = test_app().await;

		let (status, body) = send(&app, Method::POST, "/orders", Some("{not json")).await;
		assert_eq!(status, StatusCode::BAD_REQUEST);
		assert!(body["detail"].is_string());
	}

	#[tokio::test]
	async fn test_non_integer_path_id() {
		let app = test_app().await;

		let (status, body) = send(&app, Method::GET, "/orders/abc", None).await;
		assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
		assert_eq!(body["detail"][0]["loc"], json!(["path", "order_id"]));
		assert_eq!(body["detail"][0]["type"], "int_parsing");
	}

	#[tokio::test]
	async fn test_not_found_body() {
		let app = test_app().await;

		for method in [Method::GET, Method::DELETE] {
			let (status, body) = send(&app, method, "/orders/1000", None).await;
			assert_eq!(status, StatusCode::NOT_FOUND);
			assert_eq!(body, json!({ "detail": "Order not found" }));
		}

		let (status, body) = send(
			&app,
			Method::PUT,
			"/orders/1000",
			Some(r#"{"product_name": "x", "quantity": 1}"#),
		)
		.await;
		assert_eq!(status, StatusCode::NOT_FOUND);
		assert_eq!(body, json!({ "detail": "Order not found" }));
	}

	#[tokio::test]
	async fn test_update_requires_both_fields() {
		let app = test_app().await;

		let (status, body) = send(
			&app,
			Method::PUT,
			"/orders/1",
			Some(r#"{"product_name": "Only name"}"#),
		)
		.await;
		assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
		assert_eq!(body["detail"][0]["loc"], json!(["body", "quantity"]));
		assert_eq!(body["detail"][0]["type"], "missing");

		let (_, unchanged) = send(&app, Method::GET, "/orders/1", None).await;
		assert_eq!(unchanged["product_name"], "Product A");
	}

	#[tokio::test]
	async fn test_slow_request_times_out() {
		let app = Router::new()
			.route(
				"/slow",
				get(|| async {
					tokio::time::sleep(Duration::from_secs(5)).await;
					"done"
				}),
			)
			.layer(timeout_layer(Duration::from_millis(20)));

		let (status, _) = send(&app, Method::GET, "/slow", None).await;
		assert_eq!(status, StatusCode::REQUEST_TIMEOUT);
	}

	#[test]
	fn test_configured_cors_layer_builds() {
		let cors = CorsConfig {
			allowed_origins: vec!["http://localhost:3000".to_string()],
			allowed_headers: vec!["content-type".to_string()],
			allowed_methods: vec!["get".to_string(), "post".to_string()],
		};
		let _layer = cors_layer(Some(&cors));

		let wildcard = CorsConfig {
			allowed_origins: vec!["*".to_string()],
			allowed_headers: vec![],
			allowed_methods: vec![],
		};
		let _layer = cors_layer(Some(&wildcard));
	}
}
