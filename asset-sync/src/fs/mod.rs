//! Local filesystem side of a sync run: enumeration, fingerprints and
//! content types.

pub mod content_type;
pub mod fingerprint;
pub mod walker;
