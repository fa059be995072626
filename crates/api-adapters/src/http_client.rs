//! # HttpPollClient
//!
//! [`RemoteStore`] over the JSON routes served by [`crate::router`]. Transport
//! failures surface as [`DomainError::Network`]; HTTP error statuses are
//! mapped back onto the domain taxonomy.

use std::collections::BTreeMap;

use async_trait::async_trait;
use domains::{Ballot, DomainError, NewPoll, Poll, PollId, PollSnapshot, RemoteStore};
use reqwest::{Client, Response, StatusCode};
use serde::de::DeserializeOwned;
use tracing::debug;

use crate::dto::{PollListResponse, VoteAccepted};

#[derive(Clone)]
pub struct HttpPollClient {
    http: Client,
    base_url: String,
}

impl HttpPollClient {
    /// `base_url` includes the mount path, e.g. `http://localhost:3000/api`.
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_client(Client::new(), base_url)
    }

    pub fn with_client(http: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { http, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    pub async fn list_polls(&self) -> Result<BTreeMap<PollId, Poll>, DomainError> {
        let response = self.http.get(self.url("/polls")).send().await.map_err(network)?;
        let body: PollListResponse = decode(response).await?;
        Ok(body.polls)
    }
}

#[async_trait]
impl RemoteStore for HttpPollClient {
    async fn create_poll(&self, request: NewPoll) -> Result<(), DomainError> {
        debug!(poll_id = %request.id, "POST /polls");
        let response = self
            .http
            .post(self.url("/polls"))
            .json(&request)
            .send()
            .await
            .map_err(network)?;
        check(response).await.map(|_| ())
    }

    async fn fetch_poll(&self, id: &str) -> Result<PollSnapshot, DomainError> {
        let response = self
            .http
            .get(self.url(&format!("/polls/{id}")))
            .send()
            .await
            .map_err(network)?;
        decode(response).await
    }

    async fn submit_vote(&self, id: &str, ballot: Ballot) -> Result<PollSnapshot, DomainError> {
        debug!(poll_id = %id, option_id = ballot.option_id, "POST /polls/{{id}}");
        let response = self
            .http
            .post(self.url(&format!("/polls/{id}")))
            .json(&ballot)
            .send()
            .await
            .map_err(network)?;
        let body: VoteAccepted = decode(response).await?;
        Ok(body.snapshot)
    }
}

fn network(err: reqwest::Error) -> DomainError {
    DomainError::Network(err.to_string())
}

async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, DomainError> {
    check(response)
        .await?
        .json::<T>()
        .await
        .map_err(|err| DomainError::Storage(format!("unexpected response body: {err}")))
}

/// Passes 2xx responses through, turns everything else into a [`DomainError`].
async fn check(response: Response) -> Result<Response, DomainError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let url = response.url().path().to_string();
    let text = response.text().await.unwrap_or_default();
    let message = error_message(&text).unwrap_or_else(|| status.to_string());

    Err(match status {
        StatusCode::NOT_FOUND => DomainError::NotFound(last_segment(&url)),
        StatusCode::CONFLICT => DomainError::Conflict(message),
        StatusCode::BAD_REQUEST => DomainError::InvalidPayload(message),
        _ => DomainError::Storage(message),
    })
}

/// `message` from vote rejections, `error` from everything else.
fn error_message(body: &str) -> Option<String> {
    let value: serde_json::Value = serde_json::from_str(body).ok()?;
    value
        .get("message")
        .or_else(|| value.get("error"))
        .and_then(|m| m.as_str())
        .map(str::to_string)
}

fn last_segment(path: &str) -> String {
    path.rsplit('/').next().unwrap_or_default().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn trailing_slash_is_dropped_from_the_base() {
        let client = HttpPollClient::new("http://localhost:3000/api/");
        assert_eq!(client.url("/polls"), "http://localhost:3000/api/polls");
    }

    #[test]
    fn error_message_prefers_the_vote_message() {
        assert_eq!(
            error_message(r#"{"success":false,"message":"Session already participated"}"#),
            Some("Session already participated".to_string())
        );
        assert_eq!(
            error_message(r#"{"error":"Poll not found"}"#),
            Some("Poll not found".to_string())
        );
        assert_eq!(error_message("<html>"), None);
    }

    #[test]
    fn not_found_keeps_the_poll_id() {
        assert_eq!(last_segment("/api/polls/abc-123"), "abc-123");
    }
}
