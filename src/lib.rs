//! Gatewarden — member verification and onboarding service.

pub mod catalog;
pub mod config;
pub mod correlation;
pub mod error;
pub mod platform;
pub mod verify;
pub mod warden;
