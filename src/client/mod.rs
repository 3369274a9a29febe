pub mod composer;
pub mod conversation;
pub mod driver;
pub mod effects;
pub mod layout;
pub mod recency;
pub mod session;
pub mod state;
pub mod thread_list;

pub use driver::Backend;
pub use effects::{Effect, Outcome};
pub use state::ClientState;
