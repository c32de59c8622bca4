pub mod middleware;
pub mod session;

pub use middleware::{session_token, CurrentSession};
pub use session::{generate_session_token, session_cookie, SessionData, Sessions};
