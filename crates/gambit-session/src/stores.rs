//! Seams for the external collaborators: identity, friendships, and
//! direct-message persistence.
//!
//! The server never owns this data. Each trait is implemented by the
//! embedding application against whatever backs it (a database, an auth
//! service, an in-memory map in tests). All methods return futures so
//! implementations are free to do I/O.

use std::future::Future;

use gambit_protocol::{DirectMessage, StoredMessage, UserId, UserProfile};

use crate::StoreError;

/// Resolves a claimed user id to a verified profile.
pub trait IdentityStore: Send + Sync + 'static {
    /// Looks up the profile for `user`. `Ok(None)` means the identity
    /// does not exist; the connection stays unauthenticated.
    fn lookup(
        &self,
        user: UserId,
    ) -> impl Future<Output = Result<Option<UserProfile>, StoreError>> + Send;
}

/// Answers who counts as a friend for presence fan-out.
pub trait RelationshipStore: Send + Sync + 'static {
    /// The users with an accepted friendship with `user`. Pending and
    /// declined requests are not included.
    fn accepted_friends(
        &self,
        user: UserId,
    ) -> impl Future<Output = Result<Vec<UserId>, StoreError>> + Send;
}

/// Persists direct messages between friends.
pub trait MessageStore: Send + Sync + 'static {
    /// Durably stores one message, returning it with server-assigned
    /// id and timestamp.
    fn append(
        &self,
        message: DirectMessage,
    ) -> impl Future<Output = Result<StoredMessage, StoreError>> + Send;

    /// The most recent messages between two users, oldest first,
    /// capped at `limit`.
    fn history(
        &self,
        a: UserId,
        b: UserId,
        limit: usize,
    ) -> impl Future<Output = Result<Vec<StoredMessage>, StoreError>> + Send;
}
