//! Shared types used throughout the library.

mod expr;
mod socket;
pub mod transform;

pub use expr::{fmt_num, Expr};
pub use socket::{SocketType, SocketValue, ValueDomain};
pub use transform::RowMatrix;
