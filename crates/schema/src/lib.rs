//! Wire schema for the recognition engine (`engine.STYolo`).
//!
//! Message and service types are generated from `proto/engine.proto` at build
//! time. The aliases below give the generated client and server stable names.

#[allow(clippy::all, clippy::pedantic)]
pub mod engine {
    tonic::include_proto!("engine");
}

pub use engine::st_yolo_client::StYoloClient as EngineClient;
pub use engine::st_yolo_server::{StYolo as EngineService, StYoloServer as EngineServer};
pub use engine::{CamInfo, Config, Detection, DetectionLine, Point, Response};

impl Response {
    /// Handshake payload sent on the config channel.
    pub fn greeting(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            ..Default::default()
        }
    }
}

impl DetectionLine {
    pub fn new(id: i32, begin: (i32, i32), end: (i32, i32)) -> Self {
        Self {
            id,
            begin: Some(Point {
                x: begin.0,
                y: begin.1,
            }),
            end: Some(Point { x: end.0, y: end.1 }),
        }
    }
}
