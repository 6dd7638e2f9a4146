//! Domain types and models

pub mod media;
pub mod network;
pub mod record;
pub mod sync;

pub use media::*;
pub use network::*;
pub use record::*;
pub use sync::*;
