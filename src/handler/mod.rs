//! Request handler module
//!
//! Responsible for request routing dispatch: static asset routes are served
//! directly, everything else flows through the rendering pipeline.

pub mod router;
pub mod ssr;
pub mod static_files;

// Re-export main entry point
pub use router::handle_request;
