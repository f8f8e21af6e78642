//! Application layer for the broker.
//!
//! Sits between the protocol library (`broker_core`) and the socket code in
//! `infrastructure`.  Nothing here performs I/O: the dispatcher turns a decoded
//! frame header into the bytes that should be written back, and the connection
//! handler decides when to read and write them.
//!
//! # Sub-modules
//!
//! - **`dispatch`** – Maps command codes to responses: the unconditional login
//!   acknowledgement and the server directory.

pub mod dispatch;
