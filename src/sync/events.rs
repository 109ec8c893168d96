//! Events observed by the sync manager.
//!
//! `UserEvent`s feed the predictive model; `RealtimeEvent`s are server pushes
//! that make cached data stale.

use serde::{Deserialize, Serialize};

// == User Event ==
/// Something the user did in a client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum UserEvent {
    RouteChange { from: String, to: String },
    FeatureUsed { feature: String },
    Interaction,
}

// == Realtime Event ==
/// Server push names as emitted on the realtime channel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum RealtimeEvent {
    UserUpdated,
    ActivityCreated,
    MessageReceived,
    FriendRequest,
    Notification,
}

impl RealtimeEvent {
    /// Cache tags made stale by the event.
    pub fn invalidated_tags(self) -> &'static [&'static str] {
        match self {
            RealtimeEvent::UserUpdated => &["user", "profile", "friends"],
            RealtimeEvent::ActivityCreated => &["activity-list"],
            RealtimeEvent::MessageReceived => &["messages"],
            RealtimeEvent::FriendRequest => &["friend-requests"],
            RealtimeEvent::Notification => &["notifications"],
        }
    }

    /// Endpoints worth refetching right away.
    pub fn refresh_endpoints(self) -> &'static [&'static str] {
        match self {
            RealtimeEvent::UserUpdated => &["/api/friends"],
            RealtimeEvent::ActivityCreated => &["/api/activities"],
            RealtimeEvent::MessageReceived => &["/api/messages/conversations"],
            RealtimeEvent::FriendRequest => &["/api/friends/requests"],
            RealtimeEvent::Notification => &["/api/notifications"],
        }
    }
}
