//! Static preload tables: the critical login set and the per-route lists.

use std::time::Duration;

use crate::preload::{PreloadPriority, PreloadRequest};

/// Requests issued right after a user signs in.
pub fn critical_requests(user_id: &str) -> Vec<PreloadRequest> {
    vec![
        PreloadRequest::new(
            format!("user-profile:{}", user_id),
            format!("/api/users/{}", user_id),
            PreloadPriority::Immediate,
        )
        .ttl(Duration::from_secs(10 * 60))
        .tags(&["user", "profile"]),
        PreloadRequest::new("friends", "/api/friends", PreloadPriority::Immediate)
            .tags(&["friends"]),
        PreloadRequest::new(
            "conversations",
            "/api/messages/conversations",
            PreloadPriority::High,
        )
        .ttl(Duration::from_secs(60))
        .tags(&["messages"]),
        PreloadRequest::new("activities", "/api/activities", PreloadPriority::High)
            .tags(&["activities", "activity-list"]),
        PreloadRequest::new(
            "friend-requests",
            "/api/friends/requests",
            PreloadPriority::Normal,
        )
        .ttl(Duration::from_secs(2 * 60))
        .tags(&["friends", "friend-requests"]),
        PreloadRequest::new(
            "suggestions",
            "/api/users/suggestions",
            PreloadPriority::Normal,
        )
        .ttl(Duration::from_secs(15 * 60))
        .tags(&["discover"]),
        PreloadRequest::new("notifications", "/api/notifications", PreloadPriority::Low)
            .ttl(Duration::from_secs(60))
            .tags(&["notifications"]),
    ]
}

/// Requests that make a page render from cache. Unknown routes have none.
pub fn page_requests(route: &str) -> Vec<PreloadRequest> {
    let route = route.trim_end_matches('/');
    match route {
        "/dashboard" | "" => vec![
            PreloadRequest::new("activities", "/api/activities", PreloadPriority::High)
                .tags(&["activities", "activity-list"]),
            PreloadRequest::new("notifications", "/api/notifications", PreloadPriority::Normal)
                .ttl(Duration::from_secs(60))
                .tags(&["notifications"]),
        ],
        "/activities" => vec![
            PreloadRequest::new("activities", "/api/activities", PreloadPriority::High)
                .tags(&["activities", "activity-list"]),
            PreloadRequest::new(
                "activity-categories",
                "/api/activities/categories",
                PreloadPriority::Low,
            )
            .ttl(Duration::from_secs(60 * 60))
            .tags(&["activities"]),
        ],
        "/friends" => vec![
            PreloadRequest::new("friends", "/api/friends", PreloadPriority::High)
                .tags(&["friends"]),
            PreloadRequest::new(
                "friend-requests",
                "/api/friends/requests",
                PreloadPriority::High,
            )
            .ttl(Duration::from_secs(2 * 60))
            .tags(&["friends", "friend-requests"]),
        ],
        "/messages" => vec![PreloadRequest::new(
            "conversations",
            "/api/messages/conversations",
            PreloadPriority::High,
        )
        .ttl(Duration::from_secs(60))
        .tags(&["messages"])],
        "/profile" => vec![
            PreloadRequest::new("my-activities", "/api/activities/mine", PreloadPriority::Normal)
                .tags(&["activities", "activity-list"]),
            PreloadRequest::new("friends", "/api/friends", PreloadPriority::Low)
                .tags(&["friends"]),
        ],
        "/discover" => vec![
            PreloadRequest::new(
                "suggestions",
                "/api/users/suggestions",
                PreloadPriority::High,
            )
            .ttl(Duration::from_secs(15 * 60))
            .tags(&["discover"]),
            PreloadRequest::new(
                "nearby-activities",
                "/api/activities/nearby",
                PreloadPriority::Normal,
            )
            .tags(&["activities", "activity-list"]),
        ],
        _ => Vec::new(),
    }
}

const ROUTES: [&str; 6] = ["/dashboard", "/activities", "/friends", "/messages", "/profile", "/discover"];

/// Key under which an ad-hoc endpoint prefetch is stored.
pub fn endpoint_key(endpoint: &str) -> String {
    format!("endpoint:{}", endpoint)
}

/// Request for a single endpoint at `priority`. Endpoints the page tables
/// know keep their cache key, TTL and tags; anything else is keyed by path.
pub fn endpoint_request(endpoint: &str, priority: PreloadPriority) -> PreloadRequest {
    ROUTES
        .iter()
        .flat_map(|route| page_requests(route))
        .find(|request| request.endpoint == endpoint)
        .map(|request| PreloadRequest { priority, ..request })
        .unwrap_or_else(|| PreloadRequest::new(endpoint_key(endpoint), endpoint, priority))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_critical_set_has_immediate_tier() {
        let requests = critical_requests("42");
        let immediate: Vec<_> = requests
            .iter()
            .filter(|r| r.priority == PreloadPriority::Immediate)
            .collect();

        assert_eq!(immediate.len(), 2);
        assert!(requests.iter().any(|r| r.endpoint == "/api/users/42"));
        assert!(requests.len() > immediate.len());
    }

    #[test]
    fn test_known_routes() {
        for route in ["/dashboard", "/activities", "/friends", "/messages", "/profile", "/discover"] {
            assert!(!page_requests(route).is_empty(), "route {} has no data", route);
        }
        assert_eq!(page_requests("/friends/"), page_requests("/friends"));
    }

    #[test]
    fn test_endpoint_request_uses_canonical_key() {
        let request = endpoint_request("/api/notifications", PreloadPriority::Low);
        assert_eq!(request.key, "notifications");
        assert_eq!(request.priority, PreloadPriority::Low);
        assert_eq!(request.ttl, Duration::from_secs(60));
        assert_eq!(request.tags, vec!["notifications".to_string()]);

        let unknown = endpoint_request("/api/weather", PreloadPriority::Normal);
        assert_eq!(unknown.key, "endpoint:/api/weather");
        assert!(unknown.tags.is_empty());
    }

    #[test]
    fn test_unknown_route_is_empty() {
        assert!(page_requests("/settings").is_empty());
    }
}
