pub mod metrics;
pub mod shipping;
