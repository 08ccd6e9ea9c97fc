//! Read-only view of the signed-in user.
//!
//! Session management lives outside this crate; it only needs to know who
//! is acting when a report is filed.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Actor {
    pub id: String,
    pub name: String,
}

pub trait ActorContext: Send + Sync {
    /// `None` when nobody is signed in.
    fn current_actor(&self) -> Option<Actor>;
}

/// Fixed actor, e.g. taken from configuration.
#[derive(Debug, Clone, Default)]
pub struct StaticActor {
    actor: Option<Actor>,
}

impl StaticActor {
    pub fn new(id: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            actor: Some(Actor {
                id: id.into(),
                name: name.into(),
            }),
        }
    }

    pub fn anonymous() -> Self {
        Self::default()
    }
}

impl ActorContext for StaticActor {
    fn current_actor(&self) -> Option<Actor> {
        self.actor.clone()
    }
}
