//! Bridge connection management

mod client;
mod endpoint;
mod handler;

pub use client::{Connection, ConnectionState};
pub use endpoint::{bridge_endpoint, is_secure};
pub use handler::{FrameHandler, FrameSender};
