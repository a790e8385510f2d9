pub mod local_state;
pub mod remote_repository;
pub mod session_events;

pub use local_state::LocalStatePersistence;
pub use remote_repository::{ObjectStorage, RemoteError, RemoteProjectRepository};
pub use session_events::SessionEvent;
