//! HTTP service state and request handlers.
//!
//! ## Structure
//!
//! - [`handler`] - shared service state (`RelayService`), router and the
//!   submission endpoints.
//! - [`pages`] - page and acknowledgment templates.

pub mod handler;
pub mod pages;
