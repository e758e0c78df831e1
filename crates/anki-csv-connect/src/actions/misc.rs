//! Miscellaneous AnkiConnect actions: version checks and batched `multi` calls.

use serde::{Serialize, de::DeserializeOwned};

use crate::client::{AnkiClient, classify_error, into_result};
use crate::error::Result;
use crate::request::{API_VERSION, AnkiResponse};

/// Provides access to miscellaneous AnkiConnect operations.
///
/// Obtained via [`AnkiClient::misc()`].
#[derive(Debug)]
pub struct MiscActions<'a> {
    pub(crate) client: &'a AnkiClient,
}

#[derive(Serialize)]
struct MultiParams<'a> {
    actions: &'a [MultiAction],
}

/// A single sub-action of a `multi` request.
///
/// Each sub-action carries its own protocol version so AnkiConnect answers
/// with one `{result, error}` envelope per entry.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MultiAction {
    action: &'static str,
    version: u8,
    #[serde(skip_serializing_if = "Option::is_none")]
    params: Option<serde_json::Value>,
}

impl MultiAction {
    /// Create a sub-action without parameters.
    pub fn new(action: &'static str) -> Self {
        Self {
            action,
            version: API_VERSION,
            params: None,
        }
    }

    /// Create a sub-action with parameters.
    pub fn with_params<P: Serialize>(action: &'static str, params: P) -> Result<Self> {
        Ok(Self {
            action,
            version: API_VERSION,
            params: Some(serde_json::to_value(params)?),
        })
    }

    /// The action name.
    pub fn action(&self) -> &str {
        self.action
    }

    /// The serialized parameters, if any.
    pub fn params(&self) -> Option<&serde_json::Value> {
        self.params.as_ref()
    }
}

impl<'a> MiscActions<'a> {
    /// Get the AnkiConnect API version.
    ///
    /// Cheap way to verify that Anki is running and reachable.
    pub async fn version(&self) -> Result<u8> {
        self.client.invoke_without_params("version").await
    }

    /// Execute several actions in one request.
    ///
    /// The outer `Result` fails when the request itself fails; each inner
    /// `Result` is the outcome of one sub-action, in order. An empty batch
    /// returns immediately without contacting AnkiConnect.
    ///
    /// # Example
    ///
    /// ```no_run
    /// use anki_csv_connect::{AnkiClient, MultiAction};
    ///
    /// # async fn example() -> anki_csv_connect::Result<()> {
    /// let client = AnkiClient::new();
    ///
    /// let actions = vec![
    ///     MultiAction::new("deckNames"),
    ///     MultiAction::new("modelNames"),
    /// ];
    ///
    /// let results: Vec<anki_csv_connect::Result<Vec<String>>> =
    ///     client.misc().multi(&actions).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn multi<R>(&self, actions: &[MultiAction]) -> Result<Vec<Result<R>>>
    where
        R: DeserializeOwned,
    {
        if actions.is_empty() {
            return Ok(Vec::new());
        }

        let envelopes: Vec<AnkiResponse<R>> =
            self.client.invoke("multi", MultiParams { actions }).await?;
        Ok(envelopes.into_iter().map(into_result).collect())
    }

    /// Execute several actions that return null on success in one request.
    pub async fn multi_void(&self, actions: &[MultiAction]) -> Result<Vec<Result<()>>> {
        if actions.is_empty() {
            return Ok(Vec::new());
        }

        let envelopes: Vec<AnkiResponse<serde_json::Value>> =
            self.client.invoke("multi", MultiParams { actions }).await?;
        Ok(envelopes
            .into_iter()
            .map(|envelope| match envelope.error {
                Some(err) => Err(classify_error(err)),
                None => Ok(()),
            })
            .collect())
    }
}
