//! Action groups, one per AnkiConnect domain.

mod decks;
mod misc;
mod models;
mod notes;

pub use decks::DeckActions;
pub use misc::{MiscActions, MultiAction};
pub use models::ModelActions;
pub use notes::NoteActions;
