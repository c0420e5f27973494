#![doc = include_str!("../README.md")]

pub mod driver;

pub use driver::Pipeline;
