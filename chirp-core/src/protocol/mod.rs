//! Live-control protocol: the transport-agnostic request/response and event
//! types exchanged with remote clients. The server crate carries them over a
//! WebSocket; the types themselves know nothing about the transport.

pub mod events;
