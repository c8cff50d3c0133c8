//! Core types shared by every other module: the device handle and the error type.

pub mod device;
pub mod error;
