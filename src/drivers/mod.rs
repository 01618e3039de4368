//! Relay and LED drivers, pulse-input setup, and task spawning.

pub mod hw_init;
pub mod indicator;
pub mod relay;
pub mod task_pin;
