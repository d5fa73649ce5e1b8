//! Utilities shared by the RallyHub server library and its binaries.

pub mod logger;
pub mod time;
