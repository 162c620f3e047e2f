//! tastytrade REST API
//!
//! Session management and instrument lookups against the tastytrade REST
//! API. Successful responses arrive in the kebab-case `{"data": ...}`
//! envelope (list endpoints nest under `data.items`); errors arrive as
//! `{"error": {"code", "message", "errors": [...]}}`.

mod instruments;
mod models;
mod session;

pub use models::{Cryptocurrency, Customer, Future, StreamerTokens, User};
pub use session::{ApiError, RestSession};
