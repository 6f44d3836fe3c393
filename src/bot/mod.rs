//! Chat-facing layer: typed callbacks, keyboards, texts, the transport seam
//! and the router that ties handlers to inbound events.

pub mod callback;
pub mod handlers;
pub mod inbound;
pub mod keyboards;
pub mod router;
pub mod state;
pub mod testing;
pub mod texts;
pub mod transport;

pub use callback::{CallbackData, PayWith};
pub use inbound::{ChatKind, Inbound, Sender};
pub use router::{spawn_sweeper, Bot, Command};
pub use state::AppState;
pub use transport::{Button, Invoice, Keyboard, OutgoingMessage, Transport};
