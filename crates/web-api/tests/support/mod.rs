#![allow(dead_code)]

use std::{net::SocketAddr, sync::Arc, time::Duration};

use application::{
    memory::{InMemoryConversationRepository, InMemoryMessageRepository, InMemoryUserRepository},
    Clock, ConnectionHub, ConversationService, ConversationServiceDependencies, MessageService,
    MessageServiceDependencies, PasswordHasher, SystemClock, UserService,
    UserServiceDependencies,
};
use config::RealtimeConfig;
use infrastructure::BcryptPasswordHasher;
use reqwest::Client;
use serde_json::{json, Value};
use tokio::{net::TcpListener, sync::oneshot, time::sleep};
use web_api::{router, AppState, JwtConfig, JwtService};

pub const JWT_SECRET: &str = "test-secret-key-with-at-least-32-characters";

pub struct TestServer {
    pub addr: SocketAddr,
    pub client: Client,
    pub messages: Arc<InMemoryMessageRepository>,
    pub hub: Arc<ConnectionHub>,
    shutdown: Option<oneshot::Sender<()>>,
}

impl TestServer {
    pub fn http(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub fn ws(&self, user_id: Option<&str>) -> String {
        match user_id {
            Some(user_id) => format!("ws://{}/ws?userId={}", self.addr, user_id),
            None => format!("ws://{}/ws", self.addr),
        }
    }

    pub async fn register(&self, username: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.http("/api/users/register"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("register request")
    }

    pub async fn login(&self, username: &str, password: &str) -> reqwest::Response {
        self.client
            .post(self.http("/api/users/login"))
            .json(&json!({ "username": username, "password": password }))
            .send()
            .await
            .expect("login request")
    }

    /// 注册并登录，返回 token
    pub async fn signup(&self, username: &str) -> String {
        let response = self.register(username, "secret-password").await;
        assert!(response.status().is_success(), "register {username}");
        let body: Value = self
            .login(username, "secret-password")
            .await
            .json()
            .await
            .expect("login json");
        body["token"].as_str().expect("token").to_string()
    }

    pub async fn get(&self, path: &str, token: &str) -> reqwest::Response {
        self.client
            .get(self.http(path))
            .bearer_auth(token)
            .send()
            .await
            .expect("get request")
    }

    pub async fn post(&self, path: &str, token: &str, body: Value) -> reqwest::Response {
        self.client
            .post(self.http(path))
            .bearer_auth(token)
            .json(&body)
            .send()
            .await
            .expect("post request")
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(shutdown) = self.shutdown.take() {
            let _ = shutdown.send(());
        }
    }
}

pub async fn spawn_server(realtime: RealtimeConfig) -> TestServer {
    let users = Arc::new(InMemoryUserRepository::new());
    let conversations = Arc::new(InMemoryConversationRepository::new());
    let messages = Arc::new(InMemoryMessageRepository::new());
    let clock: Arc<dyn Clock> = Arc::new(SystemClock);
    let password_hasher: Arc<dyn PasswordHasher> = Arc::new(BcryptPasswordHasher::new(Some(4)));

    let user_service = UserService::new(UserServiceDependencies {
        user_repository: users.clone(),
        password_hasher,
        clock: clock.clone(),
    });
    let conversation_service = ConversationService::new(ConversationServiceDependencies {
        conversation_repository: conversations.clone(),
        user_repository: users,
        message_repository: messages.clone(),
        clock: clock.clone(),
    });
    let message_service = MessageService::new(MessageServiceDependencies {
        conversation_repository: conversations,
        message_repository: messages.clone(),
        clock: clock.clone(),
    });
    let hub = Arc::new(ConnectionHub::new(messages.clone(), clock, &realtime));

    let state = AppState {
        user_service: Arc::new(user_service),
        conversation_service: Arc::new(conversation_service),
        message_service: Arc::new(message_service),
        hub: hub.clone(),
        jwt_service: Arc::new(JwtService::new(JwtConfig {
            secret: JWT_SECRET.to_string(),
            expiration_hours: 24,
        })),
        realtime,
    };
    let app = router(state, &[]);

    let listener = TcpListener::bind("127.0.0.1:0").await.expect("bind");
    let addr = listener.local_addr().expect("addr");
    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();

    tokio::spawn(async move {
        axum::serve(listener, app.into_make_service())
            .with_graceful_shutdown(async {
                let _ = shutdown_rx.await;
            })
            .await
            .ok();
    });

    // allow server to start
    sleep(Duration::from_millis(50)).await;

    TestServer {
        addr,
        client: Client::new(),
        messages,
        hub,
        shutdown: Some(shutdown_tx),
    }
}
