/// Keeps a listener registered until dropped or explicitly unsubscribed.
#[must_use = "dropping a Subscription unsubscribes the listener"]
pub struct Subscription {
    unsubscribe: Option<Box<dyn FnOnce()>>,
}

impl Subscription {
    pub fn new(unsubscribe: impl FnOnce() + 'static) -> Self {
        Self {
            unsubscribe: Some(Box::new(unsubscribe)),
        }
    }

    /// Idempotent.
    pub fn unsubscribe(&mut self) {
        if let Some(f) = self.unsubscribe.take() {
            f();
        }
    }

    /// Leaves the listener registered for the lifetime of its source.
    pub fn detach(mut self) {
        self.unsubscribe = None;
    }

    pub fn is_active(&self) -> bool {
        self.unsubscribe.is_some()
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("active", &self.is_active())
            .finish()
    }
}
