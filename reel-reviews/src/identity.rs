//! Caller identity
//!
//! There is no process-wide "current user". The HTTP edge derives an [`Actor`]
//! for each request and passes it to every gated operation.

use reel_common::UserId;
use serde::Serialize;

/// Who is performing an operation
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(tag = "kind", content = "uid", rename_all = "snake_case")]
pub enum Actor {
    Anonymous,
    User(UserId),
}

impl Actor {
    pub fn user(uid: impl Into<String>) -> Self {
        Actor::User(UserId::new(uid))
    }

    pub fn uid(&self) -> Option<&UserId> {
        match self {
            Actor::Anonymous => None,
            Actor::User(uid) => Some(uid),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_anonymous_has_no_uid() {
        assert!(Actor::Anonymous.uid().is_none());
    }

    #[test]
    fn test_user_carries_uid() {
        let actor = Actor::user("alice");
        assert_eq!(actor.uid(), Some(&UserId::new("alice")));
    }
}
