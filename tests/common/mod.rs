//! Shared utilities for integration testing.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use user_service::config::HttpConfig;
use user_service::database::{User, UserStore};
use user_service::http::{HttpServer, ServerError};
use user_service::Shutdown;

/// A server running on an ephemeral local port.
pub struct TestServer {
    pub addr: SocketAddr,
    pub shutdown: Shutdown,
    pub handle: JoinHandle<Result<(), ServerError>>,
}

impl TestServer {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

pub fn http_config() -> HttpConfig {
    HttpConfig {
        domain: "127.0.0.1".into(),
        port: "0".into(),
        shutdown_grace_period: 2,
        request_timeout: 5,
        health_check: true,
    }
}

#[allow(dead_code)]
pub fn user(id: i64, first_name: &str, role: &str) -> User {
    User {
        id,
        first_name: first_name.into(),
        last_name: "Doe".into(),
        role: role.into(),
        user_id: id * 10,
    }
}

/// Start a server over `store` and wait until it accepts connections.
pub async fn spawn_server(config: HttpConfig, store: Arc<dyn UserStore>) -> TestServer {
    let listener = TcpListener::bind(config.bind_address()).await.unwrap();
    let addr = listener.local_addr().unwrap();

    let server = HttpServer::new(&config, store);
    let shutdown = Shutdown::new();
    let handle = tokio::spawn(server.run(listener, shutdown.subscribe()));

    wait_for_port(addr).await;

    TestServer {
        addr,
        shutdown,
        handle,
    }
}

async fn wait_for_port(addr: SocketAddr) {
    for _ in 0..50 {
        if tokio::net::TcpStream::connect(addr).await.is_ok() {
            return;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    panic!("server at {addr} never accepted connections");
}
