//! Wire models exchanged with the platform.
//!
//! Inbound: [`Interaction`] and the entity stubs it may carry.
//! Outbound: command registration payloads and [`InteractionResponse`].

pub mod channel;
pub mod command;
pub mod interaction;
pub mod member;
pub mod response;
pub mod role;
pub mod user;

pub use channel::*;
pub use command::*;
pub use interaction::*;
pub use member::*;
pub use response::*;
pub use role::*;
pub use user::*;
