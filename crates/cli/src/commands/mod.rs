pub mod host;
pub mod inspect;
pub mod thin;

pub use host::*;
pub use inspect::*;
pub use thin::*;
