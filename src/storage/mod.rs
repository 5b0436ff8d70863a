pub mod session_store;

pub use session_store::{FileSessionStore, MemorySessionStore, SESSION_KEY, SessionStore};
