#![forbid(unsafe_code)]

pub mod alert;
