pub mod error;
pub mod opcode;
pub mod store;
pub mod types;
pub mod value;

pub use error::EventError;
pub use opcode::*;
pub use store::*;
pub use types::*;
pub use value::*;
