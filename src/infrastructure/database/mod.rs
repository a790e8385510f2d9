pub mod connection;
pub mod local_state;

pub use connection::{Database, DbPool};
pub use local_state::SqliteLocalState;
