//! Miscellaneous common structs used throughout the library.

mod finger_table;
mod id;
mod key_store;
pub mod messages;
mod node;
pub mod ring;

pub use finger_table::*;
pub use id::*;
pub use key_store::*;
pub use messages::*;
pub use node::*;
