pub mod race;
pub mod language;

pub use race::Race;
pub use language::Language;
