//! End-to-end tests: a real server on an ephemeral port driven by the real
//! client over loopback.

use grpctest_client::{ClientError, Command};
use grpctest_session::{Error, Exit, Report};
use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tokio::time::timeout;
use tokio_util::sync::CancellationToken;

const KEY: &str = "e2e-secret";
const INTERVAL: Duration = Duration::from_millis(50);
const DEADLINE: Duration = Duration::from_secs(10);

struct TestServer {
    address: SocketAddr,
    shutdown: CancellationToken,
    handle: JoinHandle<Result<(), grpctest_server::ServerError>>,
}

impl TestServer {
    async fn start() -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let address = listener.local_addr().unwrap();

        let mut config = grpctest_server::Config::default();
        config.auth.key = Some(KEY.to_string());
        config.server.interval = INTERVAL;

        let shutdown = CancellationToken::new();
        let token = shutdown.clone();
        let handle =
            tokio::spawn(async move { grpctest_server::serve(listener, &config, token).await });

        Self {
            address,
            shutdown,
            handle,
        }
    }

    fn client_config(&self, key: &str, bound: u64) -> grpctest_client::Config {
        let mut config = grpctest_client::Config::default();
        config.target.host = self.address.ip().to_string();
        config.target.port = self.address.port();
        config.auth.key = Some(key.to_string());
        config.session.interval = INTERVAL;
        config.session.reconnect_delay = Duration::from_millis(100);
        config.session.bound = bound;
        config
    }

    async fn stop(self) {
        self.shutdown.cancel();
        let result = timeout(DEADLINE, self.handle)
            .await
            .expect("server did not stop in time")
            .expect("server task panicked");
        assert!(result.is_ok(), "server error: {result:?}");
    }
}

async fn run_client(
    command: Command,
    config: &grpctest_client::Config,
    shutdown: CancellationToken,
) -> Result<Report, ClientError> {
    timeout(DEADLINE, grpctest_client::run(command, config, shutdown))
        .await
        .expect("client did not finish in time")
}

fn assert_unauthorized(result: Result<Report, ClientError>) {
    match result {
        Err(ClientError::Session(Error::Unauthorized(_))) => {}
        other => panic!("expected unauthorized, got {other:?}"),
    }
}

#[tokio::test]
async fn test_wrong_key_stops_every_shape() {
    let server = TestServer::start().await;
    let config = server.client_config("wrong", 3);

    for command in [Command::Call, Command::Client, Command::Server, Command::Bidi] {
        let result = run_client(command, &config, CancellationToken::new()).await;
        assert_unauthorized(result);
    }

    server.stop().await;
}

#[tokio::test]
async fn test_calls_until_bound() {
    let server = TestServer::start().await;
    let config = server.client_config(KEY, 2);

    let report = run_client(Command::Call, &config, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.exit, Exit::BoundReached);
    assert_eq!(report.sent, 2);
    assert_eq!(report.received, 2);

    server.stop().await;
}

#[tokio::test]
async fn test_client_stream_sends_bound_then_gets_response() {
    let server = TestServer::start().await;
    let config = server.client_config(KEY, 3);

    let report = run_client(Command::Client, &config, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.exit, Exit::BoundReached);
    assert_eq!(report.sessions, 1);
    assert_eq!(report.sent, 3);

    server.stop().await;
}

#[tokio::test]
async fn test_server_stream_receives_bound() {
    let server = TestServer::start().await;
    let config = server.client_config(KEY, 2);

    let report = run_client(Command::Server, &config, CancellationToken::new())
        .await
        .unwrap();

    assert_eq!(report.exit, Exit::BoundReached);
    assert_eq!(report.received, 2);

    server.stop().await;
}

#[tokio::test]
async fn test_bidi_runs_until_shutdown() {
    let server = TestServer::start().await;
    let config = server.client_config(KEY, 1);

    let shutdown = CancellationToken::new();
    let client = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { run_client(Command::Bidi, &config, shutdown).await }
    });

    tokio::time::sleep(Duration::from_millis(400)).await;
    shutdown.cancel();

    let report = client.await.unwrap().unwrap();
    assert_eq!(report.exit, Exit::Shutdown);
    assert!(report.sent > 0, "no requests sent: {report:?}");
    assert!(report.received > 0, "no responses received: {report:?}");

    server.stop().await;
}

#[tokio::test]
async fn test_bidi_reconnects_after_server_restart() {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let address = listener.local_addr().unwrap();
    drop(listener);

    let mut client_config = grpctest_client::Config::default();
    client_config.target.host = address.ip().to_string();
    client_config.target.port = address.port();
    client_config.auth.key = Some(KEY.to_string());
    client_config.session.interval = INTERVAL;
    client_config.session.reconnect_delay = Duration::from_millis(100);

    // nothing listening yet, the client keeps retrying
    let shutdown = CancellationToken::new();
    let client = tokio::spawn({
        let shutdown = shutdown.clone();
        async move { run_client(Command::Bidi, &client_config, shutdown).await }
    });
    tokio::time::sleep(Duration::from_millis(300)).await;

    let listener = TcpListener::bind(address).await.unwrap();
    let mut config = grpctest_server::Config::default();
    config.auth.key = Some(KEY.to_string());
    config.server.interval = INTERVAL;
    let server_shutdown = CancellationToken::new();
    let server = tokio::spawn({
        let token = server_shutdown.clone();
        async move { grpctest_server::serve(listener, &config, token).await }
    });

    tokio::time::sleep(Duration::from_millis(600)).await;
    shutdown.cancel();

    let report = client.await.unwrap().unwrap();
    assert_eq!(report.exit, Exit::Shutdown);
    assert!(report.opens > 1, "expected retries: {report:?}");
    assert!(report.received > 0, "no responses after server came up: {report:?}");

    server_shutdown.cancel();
    timeout(DEADLINE, server).await.unwrap().unwrap().unwrap();
}
