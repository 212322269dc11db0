pub mod config;
pub mod error;
pub mod favicon;
pub mod models;
pub mod search;
pub mod sources;
pub mod switcher;

pub use error::{Error, Result};
pub use models::{CandidateRecord, SelectionAction, SessionContext, SourceType, SwitchOption};
pub use switcher::{resolve_selection, Switcher};
