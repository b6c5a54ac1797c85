//! Asset loading

pub mod filamesh;
