#![forbid(unsafe_code)]

pub mod scenario_runner;
