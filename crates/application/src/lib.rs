#![forbid(unsafe_code)]

pub mod alert_service;
pub mod dispatch;
pub mod reconcile;
pub mod retry;
