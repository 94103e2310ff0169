//! UI ↔ host bridge
//!
//! ```text
//! RpcClient ──rpc-request──▶ MessageChannel ──▶ RpcServer ──▶ RpcHandler (TutorApi)
//!     ▲                                             │
//!     └──────────────rpc-response───────────────────┘
//! ```
//!
//! - `protocol`: envelopes and the closed `RpcRequest` method set
//! - `transport`: Content-Length framing and `MessageChannel`
//! - `server`: id bookkeeping, one response per request, panic isolation
//! - `client`: id generation and response correlation

mod error;
mod protocol;
mod transport;
mod server;
mod client;
mod handler;

pub use error::{RpcError, RpcResult};
pub use protocol::{
    recover_request_id, Envelope, RpcRequest, RpcRequestEnvelope, RpcResponseEnvelope, TerminalEvent,
};
pub use transport::{
    read_frame, write_frame, FramedWriter, MemoryChannel, MessageChannel, MAX_FRAME_BYTES, MAX_HEADER_LINE,
};
pub use server::{RpcHandler, RpcServer};
pub use client::{RpcClient, DEFAULT_RPC_TIMEOUT};
pub use handler::TutorApi;
