//! Tournament brackets layered on top of head-to-head play

pub mod tournament;
