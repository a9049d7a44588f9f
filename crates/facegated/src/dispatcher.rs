//! Outbound actuation: tells the door controller whether the last frame
//! showed a known face.
//!
//! One attempt per recognition event, bounded by a client timeout, never
//! retried. A missed command is superseded by the next frame's command.

use facegate_core::OverallType;
use std::time::Duration;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DispatchError {
    #[error("failed to build HTTP client: {0}")]
    Client(#[source] reqwest::Error),
    #[error("device did not answer within {0:?}")]
    Timeout(Duration),
    #[error("request to device failed: {0}")]
    Request(#[source] reqwest::Error),
    #[error("device answered with status {0}")]
    Status(reqwest::StatusCode),
}

/// Two-valued signal understood by the device.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AccessCommand {
    Known,
    Unknown,
}

impl AccessCommand {
    pub fn as_str(&self) -> &'static str {
        match self {
            AccessCommand::Known => "known",
            AccessCommand::Unknown => "unknown",
        }
    }
}

impl From<OverallType> for AccessCommand {
    fn from(overall: OverallType) -> Self {
        match overall {
            OverallType::Known => AccessCommand::Known,
            OverallType::Unknown | OverallType::NoFace => AccessCommand::Unknown,
        }
    }
}

/// Stateless relay to the actuator. Cheap to clone; clones share one
/// connection pool and may dispatch concurrently.
#[derive(Clone)]
pub struct Dispatcher {
    client: reqwest::Client,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(timeout: Duration) -> Result<Self, DispatchError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout)
            .build()
            .map_err(DispatchError::Client)?;
        Ok(Self { client, timeout })
    }

    /// Send the verdict to `device` (`host:port`). Failures are logged and
    /// reported as `false`; they never reach the caller as errors.
    pub async fn dispatch(&self, overall: OverallType, device: &str) -> bool {
        let command = AccessCommand::from(overall);
        match self.send(command, device).await {
            Ok(()) => {
                tracing::debug!(device, command = command.as_str(), "command delivered");
                true
            }
            Err(e) => {
                tracing::warn!(device, command = command.as_str(), error = %e, "dispatch failed");
                false
            }
        }
    }

    /// One delivery attempt: `GET http://<target>/face_command?type=<command>`.
    pub async fn send(&self, command: AccessCommand, device: &str) -> Result<(), DispatchError> {
        let url = command_url(device);
        let response = self
            .client
            .get(&url)
            .query(&[("type", command.as_str())])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    DispatchError::Timeout(self.timeout)
                } else {
                    DispatchError::Request(e)
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(DispatchError::Status(status));
        }
        Ok(())
    }
}

fn command_url(device: &str) -> String {
    let device = device.trim_end_matches('/');
    if device.starts_with("http://") || device.starts_with("https://") {
        format!("{device}/face_command")
    } else {
        format!("http://{device}/face_command")
    }
}


#[cfg(test)]
mod tests {
    use super::testing::*;
    use super::*;
    use axum::http::StatusCode;
    use std::time::Instant;

    #[test]
    fn test_command_mapping() {
        assert_eq!(AccessCommand::from(OverallType::Known), AccessCommand::Known);
        assert_eq!(AccessCommand::from(OverallType::Unknown), AccessCommand::Unknown);
        assert_eq!(AccessCommand::from(OverallType::NoFace), AccessCommand::Unknown);
    }

    #[test]
    fn test_command_url() {
        assert_eq!(command_url("10.0.0.7"), "http://10.0.0.7/face_command");
        assert_eq!(command_url("10.0.0.7:8080/"), "http://10.0.0.7:8080/face_command");
        assert_eq!(command_url("http://door.local"), "http://door.local/face_command");
    }

    #[tokio::test]
    async fn test_dispatch_delivers_command() {
        let device = spawn_device(StatusCode::OK, Duration::ZERO).await;
        let dispatcher = Dispatcher::new(Duration::from_secs(2)).unwrap();

        assert!(dispatcher.dispatch(OverallType::Known, &device.addr).await);
        assert!(dispatcher.dispatch(OverallType::Unknown, &device.addr).await);
        assert_eq!(*device.commands.lock().unwrap(), vec!["known", "unknown"]);
    }

    #[tokio::test]
    async fn test_dispatch_non_success_status() {
        let device = spawn_device(StatusCode::INTERNAL_SERVER_ERROR, Duration::ZERO).await;
        let dispatcher = Dispatcher::new(Duration::from_secs(2)).unwrap();

        let err = dispatcher.send(AccessCommand::Known, &device.addr).await.unwrap_err();
        assert!(matches!(err, DispatchError::Status(s) if s == StatusCode::INTERNAL_SERVER_ERROR));
        assert!(!dispatcher.dispatch(OverallType::Known, &device.addr).await);
    }

    #[tokio::test]
    async fn test_dispatch_unreachable_device() {
        let dispatcher = Dispatcher::new(Duration::from_millis(500)).unwrap();
        let started = Instant::now();
        assert!(!dispatcher.dispatch(OverallType::Unknown, &dead_addr().await).await);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_dispatch_times_out_on_slow_device() {
        let device = spawn_device(StatusCode::OK, Duration::from_secs(5)).await;
        let dispatcher = Dispatcher::new(Duration::from_millis(200)).unwrap();

        let started = Instant::now();
        let err = dispatcher.send(AccessCommand::Known, &device.addr).await.unwrap_err();
        assert!(matches!(err, DispatchError::Timeout(_)), "{err}");
        assert!(started.elapsed() < Duration::from_secs(2));
    }
}
