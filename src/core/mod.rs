pub mod adaptive;
pub mod artifact;
pub mod version;

pub use adaptive::*;
pub use artifact::*;
pub use version::*;
