use parking_lot::RwLock;

/// Answers whether a signed-in user is present.
pub trait SessionProvider: Send + Sync {
    fn is_authenticated(&self) -> bool;
}

/// Session backed by an optional access token.
#[derive(Debug, Default)]
pub struct StaticSession {
    access_token: RwLock<Option<String>>,
}

impl StaticSession {
    pub fn new(access_token: Option<String>) -> Self {
        Self {
            access_token: RwLock::new(access_token.filter(|t| !t.trim().is_empty())),
        }
    }

    pub fn set_access_token(&self, access_token: Option<String>) {
        *self.access_token.write() = access_token.filter(|t| !t.trim().is_empty());
    }

    pub fn access_token(&self) -> Option<String> {
        self.access_token.read().clone()
    }
}

impl SessionProvider for StaticSession {
    fn is_authenticated(&self) -> bool {
        self.access_token.read().is_some()
    }
}
