// lib.rs
pub mod align;
pub mod bed;
pub mod collapse;
pub mod coords;
pub mod dispatch;
pub mod extend;
pub mod faidx;
pub mod filter;
pub mod merge;
pub mod model;
pub mod pipeline;
pub mod project;
pub mod round;
