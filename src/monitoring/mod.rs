//! Real-time monitoring fan-out: durable connection registry, per-peer
//! delivery, and scope-wide event broadcast.

pub mod broadcast;
pub mod delivery;
pub mod event;
pub mod registry;
pub mod sweeper;
