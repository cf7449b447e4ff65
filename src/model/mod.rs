pub mod deck;
pub mod flashcard;
pub mod session_summary;
pub mod subdeck;

pub use deck::Deck;
pub use flashcard::Flashcard;
pub use session_summary::SessionSummary;
pub use subdeck::Subdeck;
