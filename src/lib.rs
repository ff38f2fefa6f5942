//! Laundry Notify - tells people when their washer or dryer cycle is done.
//!
//! A home-automation hub publishes start/finish messages for each machine on
//! an MQTT bus. This crate correlates them into cycles, attaches users who
//! asked to be told, and pushes one notification per user when a cycle ends.

pub mod adapters;
pub mod application;
pub mod bootstrap;
pub mod config;
pub mod domain;
pub mod ports;
