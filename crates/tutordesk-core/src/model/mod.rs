mod profile;
mod session;
mod slot;

pub use profile::*;
pub use session::*;
pub use slot::*;
