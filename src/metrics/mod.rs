pub mod cache;
pub mod delta;
pub mod facade;
pub mod funnel;
pub mod handler;
pub mod period;
pub mod segments;
pub mod series;
pub mod types;
