use crate::subscription::Subscription;
use std::cell::{Cell, RefCell};
use std::rc::{Rc, Weak};

type Listener = Rc<dyn Fn(bool)>;

#[derive(Default)]
struct FlagInner {
    value: Cell<bool>,
    listeners: RefCell<Vec<(u64, Listener)>>,
    next_listener: Cell<u64>,
}

/// Host-owned boolean (ruler mode, magnet mode).
///
/// [`ModeFlag::set`] pushes changes to observers. [`ModeFlag::store`] writes
/// silently, for hosts that cannot notify; readers then rely on polling
/// [`ModeFlag::get`] once per frame.
#[derive(Clone, Default)]
pub struct ModeFlag {
    inner: Rc<FlagInner>,
}

impl ModeFlag {
    pub fn new(value: bool) -> Self {
        let flag = Self::default();
        flag.inner.value.set(value);
        flag
    }

    pub fn get(&self) -> bool {
        self.inner.value.get()
    }

    pub fn set(&self, value: bool) {
        if self.inner.value.replace(value) == value {
            return;
        }
        let listeners: Vec<Listener> = self
            .inner
            .listeners
            .borrow()
            .iter()
            .map(|(_, l)| l.clone())
            .collect();
        for listener in listeners {
            listener(value);
        }
    }

    pub fn store(&self, value: bool) {
        self.inner.value.set(value);
    }

    pub fn toggle(&self) {
        self.set(!self.get());
    }

    pub fn observe(&self, listener: impl Fn(bool) + 'static) -> Subscription {
        let id = self.inner.next_listener.get() + 1;
        self.inner.next_listener.set(id);
        self.inner
            .listeners
            .borrow_mut()
            .push((id, Rc::new(listener)));

        let weak: Weak<FlagInner> = Rc::downgrade(&self.inner);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.listeners.borrow_mut().retain(|(lid, _)| *lid != id);
            }
        })
    }
}

impl std::fmt::Debug for ModeFlag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("ModeFlag").field(&self.get()).finish()
    }
}
