use axum::{
    extract::{ws::WebSocketUpgrade, Path, Query, State},
    http::{HeaderValue, StatusCode},
    response::Response,
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use serde_json::{json, Value};
use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    trace::TraceLayer,
};
use validator::Validate;

use application::{
    AuthenticateUserRequest, ConversationView, Pagination, RegisterUserRequest, UserDto,
};
use domain::{ConversationId, Message, UserId};

use crate::{auth::AuthUser, error::ApiError, state::AppState, ws_connection};

#[derive(Debug, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
struct RegisterPayload {
    #[validate(length(min = 1, max = 50))]
    username: String,
    #[validate(length(min = 6, max = 72))]
    password: String,
    #[serde(default)]
    profile_picture: Option<String>,
}

#[derive(Debug, Deserialize, Validate)]
struct LoginPayload {
    #[validate(length(min = 1))]
    username: String,
    #[validate(length(min = 1))]
    password: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CreateConversationPayload {
    recipient_id: String,
}

#[derive(Debug, Deserialize, Validate)]
struct SendMessagePayload {
    #[validate(length(min = 1))]
    text: String,
}

#[derive(Debug, Deserialize)]
struct PaginationQuery {
    page: Option<String>,
    limit: Option<String>,
}

#[derive(Debug, Deserialize)]
struct WsQuery {
    #[serde(rename = "userId")]
    user_id: Option<String>,
}

pub fn router(state: AppState, cors_origins: &[String]) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/ws", get(websocket_upgrade))
        .nest("/api", api_routes())
        .layer(
            ServiceBuilder::new()
                .layer(TraceLayer::new_for_http())
                .layer(cors_layer(cors_origins)),
        )
        .with_state(state)
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/users/register", post(register_user))
        .route("/users/login", post(login_user))
        .route("/users", get(list_users))
        .route("/users/conversations", get(list_conversations))
        .route("/users/{user_id}", get(get_user))
        .route("/conversations", post(create_conversation))
        .route("/conversations/{conversation_id}/join", post(join_conversation))
        .route(
            "/conversations/{conversation_id}/messages",
            post(send_message).get(list_messages),
        )
        .route(
            "/conversations/{conversation_id}/messages/pagination",
            get(paginate_messages),
        )
}

/// 未配置来源时允许任意来源
fn cors_layer(origins: &[String]) -> CorsLayer {
    if origins.is_empty() {
        return CorsLayer::permissive();
    }

    let allowed: Vec<HeaderValue> = origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                tracing::warn!(origin = %origin, "忽略无效的 CORS 来源");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(allowed)
        .allow_methods(Any)
        .allow_headers(Any)
}

fn parse_conversation_id(raw: &str) -> Result<ConversationId, ApiError> {
    raw.parse::<ConversationId>().map_err(ApiError::from)
}

async fn health() -> StatusCode {
    StatusCode::OK
}

async fn register_user(
    State(state): State<AppState>,
    Json(payload): Json<RegisterPayload>,
) -> Result<Json<Value>, ApiError> {
    payload.validate()?;

    let user = state
        .user_service
        .register(RegisterUserRequest {
            username: payload.username,
            password: payload.password,
            profile_picture: payload.profile_picture,
        })
        .await?;

    tracing::info!(user_id = %user.id, "用户注册成功");
    Ok(Json(json!({ "message": "User registered successfully" })))
}

async fn login_user(
    State(state): State<AppState>,
    Json(payload): Json<LoginPayload>,
) -> Result<Json<Value>, ApiError> {
    payload
        .validate()
        .map_err(|_| ApiError::from(application::ApplicationError::InvalidCredentials))?;

    let user = state
        .user_service
        .authenticate(AuthenticateUserRequest {
            username: payload.username,
            password: payload.password,
        })
        .await?;

    let token = state.jwt_service.generate_token(user.id)?;
    Ok(Json(json!({ "token": token })))
}

async fn list_users(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> Result<Json<Vec<UserDto>>, ApiError> {
    let users = state.user_service.list_others(caller).await?;
    Ok(Json(users.iter().map(UserDto::from).collect()))
}

async fn get_user(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    Path(user_id): Path<String>,
) -> Result<Json<UserDto>, ApiError> {
    let user_id = user_id.parse::<UserId>()?;
    let user = state.user_service.get_user(user_id).await?;
    Ok(Json(UserDto::from(&user)))
}

async fn list_conversations(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
) -> Result<Json<Vec<ConversationView>>, ApiError> {
    let views = state.conversation_service.list_for_user(caller).await?;
    Ok(Json(views))
}

async fn create_conversation(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Json(payload): Json<CreateConversationPayload>,
) -> Result<Json<ConversationView>, ApiError> {
    // 无法解析的接收者与不存在的接收者同样处理
    let recipient_id = payload
        .recipient_id
        .parse::<UserId>()
        .map_err(|_| ApiError::from(domain::DomainError::InvalidRecipient))?;

    let view = state
        .conversation_service
        .open(caller, recipient_id)
        .await?;
    Ok(Json(view))
}

async fn join_conversation(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(conversation_id): Path<String>,
) -> Result<Json<ConversationView>, ApiError> {
    let conversation_id = parse_conversation_id(&conversation_id)?;
    let view = state
        .conversation_service
        .join(caller, conversation_id)
        .await?;
    Ok(Json(view))
}

async fn send_message(
    State(state): State<AppState>,
    AuthUser(caller): AuthUser,
    Path(conversation_id): Path<String>,
    Json(payload): Json<SendMessagePayload>,
) -> Result<Json<Value>, ApiError> {
    payload.validate()?;
    let conversation_id = parse_conversation_id(&conversation_id)?;

    state
        .message_service
        .send(caller, conversation_id, payload.text)
        .await?;
    Ok(Json(json!({ "message": "Message sent" })))
}

async fn list_messages(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    Path(conversation_id): Path<String>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let conversation_id = parse_conversation_id(&conversation_id)?;
    let messages = state.message_service.list(conversation_id).await?;
    Ok(Json(messages))
}

async fn paginate_messages(
    State(state): State<AppState>,
    AuthUser(_caller): AuthUser,
    Path(conversation_id): Path<String>,
    Query(query): Query<PaginationQuery>,
) -> Result<Json<Vec<Message>>, ApiError> {
    let conversation_id = parse_conversation_id(&conversation_id)?;

    let (Some(page), Some(limit)) = (query.page, query.limit) else {
        return Err(ApiError::bad_request("page and limit are required"));
    };
    let page = page
        .parse::<u32>()
        .map_err(|_| ApiError::bad_request("page must be a positive integer"))?;
    let limit = limit
        .parse::<u32>()
        .map_err(|_| ApiError::bad_request("limit must be a positive integer"))?;
    let pagination = Pagination::new(page, limit)?;

    let messages = state
        .message_service
        .paginate(conversation_id, pagination)
        .await?;
    Ok(Json(messages))
}

async fn websocket_upgrade(
    State(state): State<AppState>,
    Query(query): Query<WsQuery>,
    ws: WebSocketUpgrade,
) -> Response {
    let hub = state.hub.clone();
    ws.max_message_size(state.realtime.max_message_size)
        .on_upgrade(move |socket| ws_connection::run(socket, hub, query.user_id))
}
