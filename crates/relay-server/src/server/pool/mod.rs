//! Background workers that produce delayed answers.

pub mod worker;
