//! Platform abstraction — events in, rendering/mutation primitives out.

pub mod console;
pub mod event;
pub mod gateway;

pub use console::ConsoleGateway;
pub use event::{EventStream, GatewayEvent, ResponsePayload};
pub use gateway::{ChannelRef, FormField, FormSpec, Gateway, MenuOption, MenuSpec, RoleRef};
