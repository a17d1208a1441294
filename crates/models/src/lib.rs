pub mod clock;
pub mod error;
pub mod events;
pub mod jobs;
pub mod teams;

pub use clock::*;
pub use error::*;
pub use events::*;
pub use jobs::*;
pub use teams::*;
