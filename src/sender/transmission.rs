use super::client::InfluxClient;
use super::transport::{BatchTransport, RecordTransport};
use crate::domain::EncodedRecord;
use bytes::Bytes;
use futures::FutureExt;
use futures::future::BoxFuture;
use reqwest::header::{AUTHORIZATION, CONTENT_ENCODING, CONTENT_TYPE, HeaderMap, HeaderValue};
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, warn};

#[derive(Error, Debug)]
pub enum TransmissionError {
    #[error("Request error: {0}")]
    RequestError(#[from] reqwest::Error),
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),
    #[error("Transmission timeout")]
    Timeout,
    #[error("HTTP error: {status} - {message}")]
    HttpError { status: u16, message: String },
    #[error("Invalid header value: {0}")]
    InvalidHeaderValue(String),
}

impl TransmissionError {
    fn from_reqwest(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransmissionError::Timeout
        } else if e.is_connect() {
            TransmissionError::ConnectionFailed(e.to_string())
        } else {
            TransmissionError::RequestError(e)
        }
    }
}

pub const CONTENT_TYPE_LINE_PROTOCOL: &str = "text/plain; charset=utf-8";

impl InfluxClient {
    pub fn build_headers(&self, compressed: bool) -> Result<HeaderMap, TransmissionError> {
        let mut headers = HeaderMap::new();

        headers.insert(
            AUTHORIZATION,
            HeaderValue::from_str(&format!("Token {}", self.config.token)).map_err(|e| {
                TransmissionError::InvalidHeaderValue(format!("Invalid token: {e}"))
            })?,
        );
        headers.insert(
            CONTENT_TYPE,
            HeaderValue::from_static(CONTENT_TYPE_LINE_PROTOCOL),
        );

        if compressed {
            headers.insert(CONTENT_ENCODING, HeaderValue::from_static("gzip"));
        }

        Ok(headers)
    }

    /// POST one body to the write endpoint. Anything but a 2xx is an error.
    pub async fn write(&self, body: Bytes, compressed: bool) -> Result<(), TransmissionError> {
        let start = Instant::now();
        let bytes = body.len();
        let headers = self.build_headers(compressed)?;

        let result = self
            .client
            .post(self.write_url().clone())
            .headers(headers)
            .body(body)
            .send()
            .await;

        let response = match result {
            Ok(response) => response,
            Err(e) => {
                self.stats.record_request(false, bytes, start.elapsed());
                return Err(TransmissionError::from_reqwest(e));
            }
        };

        let status = response.status();
        let success = status.is_success();
        self.stats.record_request(success, bytes, start.elapsed());

        if success {
            debug!(
                "Wrote {} bytes (compressed: {}) in {:?}",
                bytes,
                compressed,
                start.elapsed()
            );
            Ok(())
        } else {
            let message = response.text().await.unwrap_or_default();
            Err(TransmissionError::HttpError {
                status: status.as_u16(),
                message,
            })
        }
    }
}

impl RecordTransport for InfluxClient {
    fn send_record(
        &self,
        record: EncodedRecord,
    ) -> BoxFuture<'static, Result<(), TransmissionError>> {
        let client = self.clone();
        async move { client.write(record.to_bytes(), false).await }.boxed()
    }
}

impl BatchTransport for InfluxClient {
    fn send_batch(&self, payload: Bytes) -> BoxFuture<'static, bool> {
        let client = self.clone();
        async move {
            let len = payload.len();
            match client.write(payload, true).await {
                Ok(()) => true,
                Err(e) => {
                    warn!("Batch of {} compressed bytes rejected: {}", len, e);
                    false
                }
            }
        }
        .boxed()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sender::ClientConfig;

    fn client() -> InfluxClient {
        InfluxClient::new(ClientConfig {
            base_url: "http://127.0.0.1:8086".to_string(),
            org: "o".to_string(),
            bucket: "b".to_string(),
            token: "tok".to_string(),
            ..ClientConfig::default()
        })
        .unwrap()
    }

    #[test]
    fn test_headers_for_single_record() {
        let headers = client().build_headers(false).unwrap();
        assert_eq!(headers[AUTHORIZATION], "Token tok");
        assert_eq!(headers[CONTENT_TYPE], CONTENT_TYPE_LINE_PROTOCOL);
        assert!(headers.get(CONTENT_ENCODING).is_none());
    }

    #[test]
    fn test_headers_for_batch() {
        let headers = client().build_headers(true).unwrap();
        assert_eq!(headers[CONTENT_ENCODING], "gzip");
    }

    #[test]
    fn test_token_with_newline_rejected() {
        let client = InfluxClient::new(ClientConfig {
            token: "bad\ntoken".to_string(),
            ..ClientConfig::default()
        })
        .unwrap();
        assert!(matches!(
            client.build_headers(false),
            Err(TransmissionError::InvalidHeaderValue(_))
        ));
    }
}
