//! XML serialization.
//!
//! This module serializes a `Document` tree back to XML text, plain or pretty
//! printed, and to Canonical XML (C14N), the deterministic form used to
//! compare trees byte for byte.

pub mod c14n;
pub mod xml;

pub use c14n::C14nOptions;
pub use xml::{serialize, serialize_node, serialize_with_options, SerializeOptions};
