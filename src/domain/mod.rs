//! Domain modules (vertical slices): types, wire shapes, sub-clients.

pub mod alert;
pub mod notification;
