//! Presence fan-out to accepted friends.

use gambit_protocol::{ServerEvent, UserId};
use tokio::sync::Mutex;

use crate::{ConnectionRegistry, RelationshipStore};

/// Notifies every online friend of `user` that they came online or went
/// offline.
///
/// The friend list is fetched before the registry lock is taken, so a
/// slow relationship store never blocks other connection churn. Offline
/// friends are skipped; a relationship-store failure downgrades to a
/// warning and skips the broadcast entirely (presence is best-effort).
pub async fn broadcast_presence<R: RelationshipStore>(
    registry: &Mutex<ConnectionRegistry>,
    relationships: &R,
    user: UserId,
    online: bool,
) {
    let friends = match relationships.accepted_friends(user).await {
        Ok(friends) => friends,
        Err(e) => {
            tracing::warn!(%user, error = %e, "presence broadcast skipped");
            return;
        }
    };

    let registry = registry.lock().await;
    let mut notified = 0usize;
    for friend in friends {
        if registry.send_to(
            friend,
            ServerEvent::FriendStatus {
                friend_id: user,
                online,
            },
        ) {
            notified += 1;
        }
    }
    tracing::debug!(%user, online, notified, "presence broadcast");
}
