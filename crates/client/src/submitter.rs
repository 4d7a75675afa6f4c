use crate::error::{ClientError, SubmissionKind};
use crate::geometry::CropRect;
use crate::lines::SyncedConfig;
use crate::metrics::SubmissionMetrics;
use crate::session::Session;
use schema::{CamInfo, EngineClient};
use std::time::{Duration, Instant};
use tonic::Code;
use tonic::transport::Channel;
use tracing::Instrument;

/// Successful answer from the engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetectionOutcome {
    pub message: String,
    /// Advisory that did not prevent the detection from being accepted.
    pub warning: Option<String>,
}

/// Issues `SendDetection` calls, one per submission, each under its own deadline.
pub struct Submitter {
    client: EngineClient<Channel>,
    metrics: SubmissionMetrics,
}

impl Submitter {
    pub fn new(session: &Session) -> Self {
        Self {
            client: session.client(),
            metrics: SubmissionMetrics::default(),
        }
    }

    pub async fn submit(
        &mut self,
        config: &SyncedConfig,
        payload: Vec<u8>,
        rect: CropRect,
        line_id: i32,
        deadline: Duration,
    ) -> Result<DetectionOutcome, ClientError> {
        let timestamp = chrono::Utc::now().timestamp();
        let cam_info = build_request(config, payload, rect, line_id, timestamp)?;

        let span = tracing::info_span!("submit_detection", line_id);
        tracing::debug!(
            cam_id = %cam_info.cam_id,
            rect = %rect,
            line_id,
            bytes = cam_info.image.len(),
            "Submitting detection"
        );

        let start = Instant::now();
        let mut request = tonic::Request::new(cam_info);
        request.set_timeout(deadline);

        let call = tokio::time::timeout(deadline, self.client.send_detection(request));
        let result = match call.instrument(span).await {
            Ok(Ok(response)) => interpret(response.into_inner()),
            Ok(Err(status)) => Err(classify_status(&status, start.elapsed(), deadline)),
            Err(_) => Err(ClientError::submission(
                SubmissionKind::Timeout,
                format!("no answer within {:?}", deadline),
            )),
        };

        let outcome = match &result {
            Ok(DetectionOutcome { warning: None, .. }) => "ok",
            Ok(DetectionOutcome {
                warning: Some(_), ..
            }) => "warning",
            Err(e) => match e.submission_kind() {
                Some(SubmissionKind::Timeout) => "timeout",
                Some(SubmissionKind::ServerRejected) => "rejected",
                _ => "transport_failure",
            },
        };
        self.metrics.record(start.elapsed(), outcome);

        result
    }
}

/// Builds the wire request. Fails before any network activity when the line
/// is not part of the synced config.
pub fn build_request(
    config: &SyncedConfig,
    payload: Vec<u8>,
    rect: CropRect,
    line_id: i32,
    timestamp: i64,
) -> Result<CamInfo, ClientError> {
    if config.uid().is_empty() {
        return Err(ClientError::Validation(
            "config uid is empty; sync before submitting".to_string(),
        ));
    }

    if !config.contains_line(line_id) {
        return Err(ClientError::Validation(format!(
            "detection line {} is not in config {} (known: {:?})",
            line_id,
            config.uid(),
            config.line_ids()
        )));
    }

    Ok(CamInfo {
        cam_id: config.uid().to_string(),
        timestamp,
        image: payload,
        detection: Some(rect.to_detection(line_id)),
    })
}

/// A non-empty error wins over everything else; a warning alone is still a success.
pub fn interpret(response: schema::Response) -> Result<DetectionOutcome, ClientError> {
    if !response.error.is_empty() {
        return Err(ClientError::submission(
            SubmissionKind::ServerRejected,
            response.error,
        ));
    }

    let warning = (!response.warning.is_empty()).then_some(response.warning);

    Ok(DetectionOutcome {
        message: response.message,
        warning,
    })
}

/// Only a spent deadline is a timeout. An engine cancelling early is a
/// transport failure.
fn classify_status(status: &tonic::Status, elapsed: Duration, deadline: Duration) -> ClientError {
    let kind = match status.code() {
        Code::DeadlineExceeded => SubmissionKind::Timeout,
        // tonic reports an expired grpc-timeout as Cancelled.
        Code::Cancelled if elapsed >= deadline => SubmissionKind::Timeout,
        _ => SubmissionKind::TransportFailure,
    };

    ClientError::submission(kind, format!("{:?}: {}", status.code(), status.message()))
}
