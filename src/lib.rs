//! Exposes an IMAP inbox as `mcp-imap://` resources.
//!
//! [`mail`] owns the IMAP session and message decomposition, [`resources`]
//! maps resource URIs onto it, and [`mcp`] serves those resources over the
//! Model Context Protocol.

pub mod auth;
pub mod config;
pub mod domain;
pub mod mail;
pub mod mcp;
pub mod resources;
