pub mod auth;
pub mod push;
pub mod retrieval;

pub use auth::{AuthFlow, AuthStart, CallbackOutcome, CallbackQuery};
pub use push::PushDispatcher;
pub use retrieval::FileRetriever;
