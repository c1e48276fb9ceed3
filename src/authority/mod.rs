//! External violation authority boundary.
//!
//! The authority is a request/response service keyed by license plate.
//! This module defines the [`ViolationAuthority`] trait with its typed
//! [`AuthorityError`], an HTTP implementation, and a scripted one.

mod client;
mod http;
mod scripted;

pub use client::{AuthorityError, AuthorityResponse, ViolationAuthority};
pub use http::{HTTP_AUTHORITY_SOURCE, HttpAuthority};
pub use scripted::{SCRIPTED_AUTHORITY_SOURCE, ScriptedAuthority};
