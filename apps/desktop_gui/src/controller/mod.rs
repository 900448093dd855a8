//! Controller layer: UI events, selection and form state machines, and command orchestration.

pub mod browser;
pub mod configurator;
pub mod events;
pub mod orchestration;
pub mod selection;
