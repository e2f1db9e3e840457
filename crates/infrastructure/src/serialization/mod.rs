//! JSON encoding for files written by the client.
//!
//! Output is pretty-printed with 2-space indentation and a trailing
//! newline, so a credentials file stays readable when inspected by hand.

mod json;

pub use json::*;
