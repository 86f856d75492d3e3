//! Background workers

pub mod sampler;
