//! Dialog-based XDG Desktop Portal backend for Otto.
//!
//! Each portal call is paired with a request object exported on the session
//! bus and a dialog presented by a helper program. A single dispatcher owns
//! every open dialog and ends each interaction exactly once, either with the
//! user's answer or because the frontend closed the request.

pub mod config;
pub mod dialog;
pub mod error;
pub mod portal;
pub mod request;
