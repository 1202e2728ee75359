use std::fmt::Display;
use uuid::Uuid;

/// Identity of a store instance.
///
/// `family` names the backend kind and `instance` tells two stores of the same
/// kind apart. Sessions carry the origin of the store that opened them, so a
/// mismatch is detected by comparing tokens.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct StoreOrigin {
    family: &'static str,
    instance: Uuid,
}

impl StoreOrigin {
    pub fn new(family: &'static str) -> Self {
        StoreOrigin {
            family,
            instance: Uuid::new_v4(),
        }
    }

    pub fn family(&self) -> &'static str {
        self.family
    }

    pub fn instance(&self) -> Uuid {
        self.instance
    }
}

impl Display for StoreOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.family, self.instance)
    }
}

/// Opaque handle to a store-side session.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SessionHandle {
    id: Uuid,
    origin: StoreOrigin,
}

impl SessionHandle {
    pub fn new(origin: StoreOrigin) -> Self {
        SessionHandle {
            id: Uuid::new_v4(),
            origin,
        }
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn origin(&self) -> &StoreOrigin {
        &self.origin
    }
}

impl Display for SessionHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "session {} on {}", self.id, self.origin)
    }
}
