#![doc = include_str!("../README.md")]

mod common;
pub mod handoff;

pub use common::*;
pub use handoff::{Claim, Handoff};
