//! Runtime: logging init, registry bootstrap and the stdin render loop.

pub mod boot;
pub mod pipe;
