//! The AnkiConnect client and builder.

use std::time::Duration;

use reqwest::Client;
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, trace};

use crate::actions::{DeckActions, MiscActions, ModelActions, NoteActions};
use crate::error::{Error, Result};
use crate::request::{AnkiRequest, AnkiResponse};

/// Default URL for AnkiConnect.
pub const DEFAULT_URL: &str = "http://127.0.0.1:8765";

/// Default timeout for requests.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

/// The main client for talking to AnkiConnect.
///
/// # Example
///
/// ```no_run
/// use anki_csv_connect::AnkiClient;
///
/// # async fn example() -> anki_csv_connect::Result<()> {
/// let client = AnkiClient::new();
/// let version = client.misc().version().await?;
/// println!("AnkiConnect version: {}", version);
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Clone)]
pub struct AnkiClient {
    http_client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl AnkiClient {
    /// Create a client for `http://127.0.0.1:8765` with a 30 second timeout.
    pub fn new() -> Self {
        Self::builder().build()
    }

    /// Create a builder for custom client configuration.
    pub fn builder() -> ClientBuilder {
        ClientBuilder::new()
    }

    /// The URL requests are posted to.
    pub fn url(&self) -> &str {
        &self.base_url
    }

    /// Access deck operations.
    pub fn decks(&self) -> DeckActions<'_> {
        DeckActions { client: self }
    }

    /// Access miscellaneous operations, including batched `multi` calls.
    pub fn misc(&self) -> MiscActions<'_> {
        MiscActions { client: self }
    }

    /// Access note operations.
    pub fn notes(&self) -> NoteActions<'_> {
        NoteActions { client: self }
    }

    /// Access model (note type) operations.
    pub fn models(&self) -> ModelActions<'_> {
        ModelActions { client: self }
    }

    /// Execute an action without parameters.
    pub(crate) async fn invoke_without_params<R>(&self, action: &str) -> Result<R>
    where
        R: DeserializeOwned,
    {
        let request = AnkiRequest::<()>::without_params(action, self.api_key.as_deref());
        let response = self.post(&request).await?;
        into_result(response)
    }

    /// Execute an action with parameters.
    pub(crate) async fn invoke<P, R>(&self, action: &str, params: P) -> Result<R>
    where
        P: Serialize,
        R: DeserializeOwned,
    {
        let request = AnkiRequest::new(action, params, self.api_key.as_deref());
        let response = self.post(&request).await?;
        into_result(response)
    }

    /// Execute an action that returns null on success.
    pub(crate) async fn invoke_void<P>(&self, action: &str, params: P) -> Result<()>
    where
        P: Serialize,
    {
        let request = AnkiRequest::new(action, params, self.api_key.as_deref());
        let response: AnkiResponse<serde_json::Value> = self.post(&request).await?;

        // A null result is success for these actions; only the error matters.
        match response.error {
            Some(err) => Err(classify_error(err)),
            None => Ok(()),
        }
    }

    /// Post a request envelope and decode the response envelope.
    async fn post<T, R>(&self, request: &AnkiRequest<'_, T>) -> Result<AnkiResponse<R>>
    where
        T: Serialize,
        R: DeserializeOwned,
    {
        debug!(action = request.action, url = %self.base_url, "AnkiConnect request");

        let response = self
            .http_client
            .post(&self.base_url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_connect() {
                    Error::ConnectionRefused
                } else {
                    Error::Http(e)
                }
            })?;

        let body = response.bytes().await?;
        trace!(action = request.action, bytes = body.len(), "AnkiConnect response");

        Ok(serde_json::from_slice(&body)?)
    }
}

impl Default for AnkiClient {
    fn default() -> Self {
        Self::new()
    }
}

/// Turn a response envelope into the action's result.
pub(crate) fn into_result<R>(response: AnkiResponse<R>) -> Result<R> {
    match (response.result, response.error) {
        (Some(result), None) => Ok(result),
        (_, Some(err)) => Err(classify_error(err)),
        (None, None) => Err(Error::EmptyResponse),
    }
}

/// Map an AnkiConnect error string onto the error type.
pub(crate) fn classify_error(err: String) -> Error {
    if err.contains("permission") {
        Error::PermissionDenied
    } else {
        Error::AnkiConnect(err)
    }
}

/// Builder for creating a customized [`AnkiClient`].
///
/// # Example
///
/// ```no_run
/// use std::time::Duration;
/// use anki_csv_connect::AnkiClient;
///
/// let client = AnkiClient::builder()
///     .url("http://localhost:8765")
///     .api_key("my-secret-key")
///     .timeout(Duration::from_secs(60))
///     .build();
/// ```
#[derive(Debug, Clone)]
pub struct ClientBuilder {
    base_url: String,
    api_key: Option<String>,
    timeout: Duration,
}

impl ClientBuilder {
    /// Create a new builder with default settings.
    pub fn new() -> Self {
        Self {
            base_url: DEFAULT_URL.to_string(),
            api_key: None,
            timeout: DEFAULT_TIMEOUT,
        }
    }

    /// Set the AnkiConnect URL.
    pub fn url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    /// Set the API key, for AnkiConnect setups that require one.
    pub fn api_key(mut self, key: impl Into<String>) -> Self {
        self.api_key = Some(key.into());
        self
    }

    /// Set the request timeout.
    pub fn timeout(mut self, duration: Duration) -> Self {
        self.timeout = duration;
        self
    }

    /// Build the client.
    pub fn build(self) -> AnkiClient {
        let http_client = Client::builder()
            .timeout(self.timeout)
            .build()
            .expect("Failed to build HTTP client");

        AnkiClient {
            http_client,
            base_url: self.base_url,
            api_key: self.api_key,
        }
    }
}

impl Default for ClientBuilder {
    fn default() -> Self {
        Self::new()
    }
}
