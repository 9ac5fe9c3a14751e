pub mod charts;
pub mod cleaning;
pub mod config;
pub mod dates;
pub mod frame;
pub mod kpi;
pub mod pipeline;
pub mod reconcile;
pub mod report;
pub mod standardize;
