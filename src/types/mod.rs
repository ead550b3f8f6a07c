pub mod anomaly;
pub mod session;
