use bevy::reflect::Reflect;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct LoadTicket<K> {
    pub key: K,
    pub generation: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Reflect)]
pub enum LoadOutcome {
    /// The load belongs to the latest request and succeeded.
    Current,
    /// A newer request was made since; discard the result.
    Stale,
    /// The latest request failed. The rig stays without a model.
    Failed,
}

/// Which avatar is wanted. Only the ticket of the latest request resolves as
/// [`LoadOutcome::Current`]; results of older tickets must be released without touching the rig.
#[derive(Debug, Clone)]
pub struct AvatarSelection<K> {
    current: Option<K>,
    generation: u64,
    loaded: bool,
}

impl<K> Default for AvatarSelection<K> {
    fn default() -> Self {
        Self {
            current: None,
            generation: 0,
            loaded: false,
        }
    }
}

impl<K: Clone + Eq> AvatarSelection<K> {
    /// Starts loading `key`.
    ///
    /// Returns `None` if `key` is already the current, fully loaded avatar. Otherwise every
    /// outstanding ticket becomes stale and the host must tear down the current model before
    /// starting the new load.
    pub fn request(&mut self, key: K) -> Option<LoadTicket<K>> {
        if self.loaded && self.current.as_ref() == Some(&key) {
            return None;
        }
        self.generation += 1;
        self.current = Some(key.clone());
        self.loaded = false;
        Some(LoadTicket {
            key,
            generation: self.generation,
        })
    }

    /// Classifies a finished load.
    pub fn resolve(&mut self, ticket: &LoadTicket<K>, succeeded: bool) -> LoadOutcome {
        if !self.is_pending(ticket) {
            return LoadOutcome::Stale;
        }
        if succeeded {
            self.loaded = true;
            LoadOutcome::Current
        } else {
            LoadOutcome::Failed
        }
    }

    /// The ticket belongs to the latest request and that request has not finished yet.
    pub fn is_pending(&self, ticket: &LoadTicket<K>) -> bool {
        !self.loaded
            && ticket.generation == self.generation
            && self.current.as_ref() == Some(&ticket.key)
    }

    pub fn current(&self) -> Option<&K> {
        self.current.as_ref()
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }
}
