//! geoconvert Geo - CRS policy and extent estimation
//!
//! This crate holds the CRS decisions of a conversion and the boundary-sampling
//! estimate of a dataset extent in WGS84.

pub mod crs;
pub mod extent;
pub mod policy;
