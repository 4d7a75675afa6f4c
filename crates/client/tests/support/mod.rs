//! In-process recognition engine for integration tests.

#![allow(dead_code)]

use schema::{CamInfo, Config, DetectionLine, EngineServer, EngineService};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::sync::{broadcast, mpsc};
use tokio_stream::wrappers::{ReceiverStream, TcpListenerStream};
use tonic::transport::Server;
use tonic::{Request, Status, Streaming};

/// What the engine does on the config channel once the first handshake arrives.
#[derive(Clone)]
pub enum ConfigScript {
    /// Push this config, then echo every `SetConfig` back on the stream.
    Push(Config),
    /// Push these configs in order, then end the stream.
    Sequence(Vec<Config>),
    /// Keep the stream open and never send anything.
    Silent,
    /// End the stream cleanly without sending a config.
    Hangup,
    /// Fail the stream with this status.
    Fail(Status),
    /// Refuse the `ConfigUpdater` call itself with this status.
    Refuse(Status),
}

/// How the engine answers `SendDetection`.
#[derive(Clone)]
pub enum DetectionScript {
    Reply(schema::Response),
    Delayed(Duration, schema::Response),
    Fail(Status),
}

#[derive(Clone)]
pub struct MockEngine {
    state: Arc<EngineState>,
}

struct EngineState {
    config_script: ConfigScript,
    detection_script: DetectionScript,
    handshakes: Mutex<Vec<String>>,
    published: Mutex<Vec<Config>>,
    detections: Mutex<Vec<CamInfo>>,
    echo: broadcast::Sender<Config>,
}

impl MockEngine {
    pub fn new(config_script: ConfigScript, detection_script: DetectionScript) -> Self {
        let (echo, _) = broadcast::channel(16);
        Self {
            state: Arc::new(EngineState {
                config_script,
                detection_script,
                handshakes: Mutex::new(Vec::new()),
                published: Mutex::new(Vec::new()),
                detections: Mutex::new(Vec::new()),
                echo,
            }),
        }
    }

    /// Engine that issues `uid` with no lines and answers every detection with `reply`.
    pub fn with_uid(uid: &str, reply: schema::Response) -> Self {
        Self::new(
            ConfigScript::Push(Config {
                uid: uid.to_string(),
                detection_lines: Vec::new(),
            }),
            DetectionScript::Reply(reply),
        )
    }

    pub fn handshakes(&self) -> Vec<String> {
        self.state.handshakes.lock().unwrap().clone()
    }

    pub fn published(&self) -> Vec<Config> {
        self.state.published.lock().unwrap().clone()
    }

    pub fn detections(&self) -> Vec<CamInfo> {
        self.state.detections.lock().unwrap().clone()
    }

    /// Serves on an ephemeral localhost port and returns its address.
    pub async fn spawn(&self) -> SocketAddr {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let service = EngineServer::new(self.clone());

        tokio::spawn(async move {
            Server::builder()
                .add_service(service)
                .serve_with_incoming(TcpListenerStream::new(listener))
                .await
                .unwrap();
        });

        addr
    }
}

pub fn reply(message: &str, error: &str, warning: &str) -> schema::Response {
    schema::Response {
        message: message.to_string(),
        error: error.to_string(),
        warning: warning.to_string(),
    }
}

pub fn line(id: i32) -> DetectionLine {
    DetectionLine::new(id, (1, 1), (416, 416))
}

/// An address nothing is listening on.
pub async fn unused_addr() -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    listener.local_addr().unwrap()
}

#[tonic::async_trait]
impl EngineService for MockEngine {
    async fn send_detection(
        &self,
        request: Request<CamInfo>,
    ) -> Result<tonic::Response<schema::Response>, Status> {
        self.state
            .detections
            .lock()
            .unwrap()
            .push(request.into_inner());

        match &self.state.detection_script {
            DetectionScript::Reply(reply) => Ok(tonic::Response::new(reply.clone())),
            DetectionScript::Delayed(delay, reply) => {
                tokio::time::sleep(*delay).await;
                Ok(tonic::Response::new(reply.clone()))
            }
            DetectionScript::Fail(status) => Err(status.clone()),
        }
    }

    type ConfigUpdaterStream = ReceiverStream<Result<Config, Status>>;

    async fn config_updater(
        &self,
        request: Request<Streaming<schema::Response>>,
    ) -> Result<tonic::Response<Self::ConfigUpdaterStream>, Status> {
        if let ConfigScript::Refuse(status) = &self.state.config_script {
            return Err(status.clone());
        }

        let mut inbound = request.into_inner();
        let (tx, rx) = mpsc::channel(16);
        let state = Arc::clone(&self.state);
        let mut echoes = state.echo.subscribe();

        tokio::spawn(async move {
            // Nothing is pushed before the client has said hello.
            match inbound.message().await {
                Ok(Some(hello)) => state.handshakes.lock().unwrap().push(hello.message),
                _ => return,
            }

            let handshake_state = Arc::clone(&state);
            tokio::spawn(async move {
                while let Ok(Some(msg)) = inbound.message().await {
                    handshake_state.handshakes.lock().unwrap().push(msg.message);
                }
            });

            match state.config_script.clone() {
                ConfigScript::Push(initial) => {
                    if tx.send(Ok(initial)).await.is_err() {
                        return;
                    }
                    while let Ok(config) = echoes.recv().await {
                        if tx.send(Ok(config)).await.is_err() {
                            break;
                        }
                    }
                }
                ConfigScript::Sequence(configs) => {
                    for config in configs {
                        if tx.send(Ok(config)).await.is_err() {
                            return;
                        }
                    }
                }
                ConfigScript::Silent => {
                    let _keep_open = tx;
                    std::future::pending::<()>().await;
                }
                ConfigScript::Hangup => drop(tx),
                ConfigScript::Fail(status) => {
                    let _ = tx.send(Err(status)).await;
                }
                ConfigScript::Refuse(_) => {}
            }
        });

        Ok(tonic::Response::new(ReceiverStream::new(rx)))
    }

    async fn set_config(&self, request: Request<Config>) -> Result<tonic::Response<Config>, Status> {
        let config = request.into_inner();
        self.state.published.lock().unwrap().push(config.clone());
        // Hot reload: every open channel sees the new config.
        let _ = self.state.echo.send(config.clone());
        Ok(tonic::Response::new(config))
    }
}
