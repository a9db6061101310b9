//! Session layer — message model, persistence, and the session store.

pub mod model;
pub mod prefs;
pub mod storage;
pub mod store;

pub use model::{
    Card, DropdownContext, DropdownField, FlowAction, Message, Sender, SessionEvent, Suggestion,
};
pub use prefs::{Preferences, PreferencesStore, Theme};
pub use storage::Storage;
pub use store::{PersistedSession, SessionStore};
