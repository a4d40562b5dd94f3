//! Test modules for the jsonrpc-dispatch-http crate
//!
//! Handler tests drive `JsonRpcHttpHandler` with in-memory request bodies;
//! server tests go through a real TCP listener.
