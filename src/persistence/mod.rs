//! This module contains the state management logic for the pollwatch
//! application.

pub mod alert_state;
pub mod error;
pub mod sqlite;
pub mod traits;

pub use alert_state::{load_alert_state, save_alert_state, state_key};
pub use error::PersistenceError;
pub use sqlite::SqliteStateRepository;
pub use traits::{KeyValueStore, StateStore};
