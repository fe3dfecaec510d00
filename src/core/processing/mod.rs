//! Compute stages, from per-pixel operations up to the pull-based analysis plan.
pub mod anomaly;
pub mod collection;
pub mod elevation;
pub mod lst;
pub mod masking;
pub mod ops;
pub mod pipeline;
pub mod preprocess;
pub mod reduce;
pub mod resample;
pub mod scoring;
pub mod temporal;
