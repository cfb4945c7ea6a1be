pub mod filter;
pub mod home;
pub mod models;
pub mod mood;
pub mod view;

pub use filter::EntryFilter;
pub use home::{HomeModel, RecordingStatus};
pub use models::{EntryEdits, JournalEntry, Topic};
pub use mood::Mood;
pub use view::{DaySection, EntryCard};
