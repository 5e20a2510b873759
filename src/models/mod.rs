//! This module contains the data models for the pollwatch application.

pub mod alert_state;
pub mod entity;
pub mod event;
pub mod notification;

pub use alert_state::{AlertState, KeySet, RuleState, ScalarMap};
pub use entity::{Attributes, Entity, EntityKey, Scalar, attr};
pub use event::{Event, EventKind};
pub use notification::{DeliveryRecord, Destination, NotificationMessage};
