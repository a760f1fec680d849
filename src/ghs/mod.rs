pub mod codec;
pub mod edges;
pub mod message;
pub mod processor;
pub mod state;

pub use codec::{decode, encode, CodecError};
pub use edges::*;
pub use message::*;
pub use processor::*;
pub use state::*;
