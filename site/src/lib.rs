//! HTTP frontend of the archlinux.de mirror redirector.

pub mod app;
pub mod error;
pub mod handlers;
