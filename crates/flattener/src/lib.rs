#![doc = include_str!("../README.md")]

pub mod flatten;

pub use flatten::{Flattener, FlattenerStats};
