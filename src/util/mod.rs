//! Various utilities

pub mod cache;
pub mod hash;
pub mod pnext;
