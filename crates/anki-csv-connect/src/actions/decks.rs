//! Deck-related AnkiConnect actions.

use serde::Serialize;

use crate::client::AnkiClient;
use crate::error::Result;

/// Provides access to deck-related AnkiConnect operations.
///
/// Obtained via [`AnkiClient::decks()`].
#[derive(Debug)]
pub struct DeckActions<'a> {
    pub(crate) client: &'a AnkiClient,
}

#[derive(Serialize)]
struct CreateDeckParams<'a> {
    deck: &'a str,
}

impl<'a> DeckActions<'a> {
    /// Get all deck names.
    pub async fn names(&self) -> Result<Vec<String>> {
        self.client.invoke_without_params("deckNames").await
    }

    /// Create a deck, returning its ID.
    ///
    /// Creating a deck that already exists is not an error; the existing
    /// deck's ID is returned.
    ///
    /// # Example
    ///
    /// ```no_run
    /// # use anki_csv_connect::AnkiClient;
    /// # async fn example() -> anki_csv_connect::Result<()> {
    /// let client = AnkiClient::new();
    /// let deck_id = client.decks().create("Spanish::Verbs").await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn create(&self, name: &str) -> Result<i64> {
        self.client
            .invoke("createDeck", CreateDeckParams { deck: name })
            .await
    }
}
