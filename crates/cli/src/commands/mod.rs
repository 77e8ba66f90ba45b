pub mod inspect;
pub mod runtime;

pub use inspect::*;
pub use runtime::*;
