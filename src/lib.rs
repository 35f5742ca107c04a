//! CortenBrowser VM profiling session manager
//!
//! Captures, caches, serializes, and tears down execution profiles produced
//! by the hosting virtual machine's instrumentation engine. See
//! [`profiling_api`] for the embedding surface.

pub use profiling_api::*;
