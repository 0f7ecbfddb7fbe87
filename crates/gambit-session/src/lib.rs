//! Session layer for Gambit: who is connected, and how to reach them.
//!
//! This crate owns three concerns:
//!
//! 1. **Connection registry** ([`ConnectionRegistry`]): maps each
//!    authenticated user to its one live connection.
//! 2. **Presence propagation** ([`broadcast_presence`]): tells a user's
//!    accepted friends when they come online or go offline.
//! 3. **External collaborator seams** ([`IdentityStore`],
//!    [`RelationshipStore`], [`MessageStore`]): the traits behind which
//!    authentication, friendships, and direct-chat persistence live.
//!    Gambit never implements these itself; the embedding application
//!    does (database, auth provider, in-memory fixture for tests).
//!
//! # How it fits in the stack
//!
//! ```text
//! Room layer (above)   ← fans out through per-user senders
//!     ↕
//! Session layer (this crate)  ← identity ↔ connection mapping
//!     ↕
//! Protocol layer (below)      ← UserId, ServerEvent types
//! ```

#![allow(async_fn_in_trait)]

mod error;
mod presence;
mod registry;
mod stores;

pub use error::StoreError;
pub use presence::broadcast_presence;
pub use registry::{ClientSender, ConnectionRegistry};
pub use stores::{IdentityStore, MessageStore, RelationshipStore};
