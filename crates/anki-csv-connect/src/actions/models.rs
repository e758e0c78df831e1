//! Model (note type) AnkiConnect actions.

use serde::Serialize;

use crate::client::AnkiClient;
use crate::error::Result;

/// Provides access to model-related AnkiConnect operations.
///
/// Obtained via [`AnkiClient::models()`].
#[derive(Debug)]
pub struct ModelActions<'a> {
    pub(crate) client: &'a AnkiClient,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ModelNameParams<'a> {
    model_name: &'a str,
}

impl<'a> ModelActions<'a> {
    /// Get all model names.
    pub async fn names(&self) -> Result<Vec<String>> {
        self.client.invoke_without_params("modelNames").await
    }

    /// Get the field names of a model, in field order.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use anki_csv_connect::AnkiClient;
    /// # async fn example() -> anki_csv_connect::Result<()> {
    /// let client = AnkiClient::new();
    /// let fields = client.models().field_names("Basic").await?;
    /// // ["Front", "Back"]
    /// # Ok(())
    /// # }
    /// ```
    pub async fn field_names(&self, model_name: &str) -> Result<Vec<String>> {
        self.client
            .invoke("modelFieldNames", ModelNameParams { model_name })
            .await
    }
}
