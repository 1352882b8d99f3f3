pub mod answer;
pub mod feedback;
pub mod flashcard;
pub mod profile;
pub mod question;
pub mod result;
pub mod school_context;
pub mod user;
