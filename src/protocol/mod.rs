//! Wire formats shared between replicas and clients.
//!
//! Everything that travels over the bus channel or the WebSocket is defined
//! here as a serde discriminated union, so the JSON shapes are fixed by the
//! type definitions rather than by ad-hoc dictionaries.

pub mod events;
pub mod messages;
pub mod room_codes;
pub mod types;
pub mod validation;

pub use events::{Envelope, GameEvent, PlayerAction};
pub use messages::{ClientCommand, RegisterReply};
pub use types::{RoomName, SessionId};
