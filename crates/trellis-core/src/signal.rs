use std::cell::RefCell;
use std::rc::Rc;

use slotmap::{SlotMap, new_key_type};

use crate::effects::Subscription;

new_key_type! {
    pub struct SubId;
}

/// Observable value with an explicit observer list.
///
/// Observers run after the write with a snapshot of the new value. They may
/// write the signal again or drop their own subscription.
pub struct Signal<T: 'static>(Rc<RefCell<Inner<T>>>);

struct Inner<T> {
    value: T,
    subs: SlotMap<SubId, Rc<dyn Fn(&T)>>,
}

impl<T> Signal<T> {
    pub fn new(value: T) -> Self {
        Self(Rc::new(RefCell::new(Inner {
            value,
            subs: SlotMap::with_key(),
        })))
    }

    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.0.borrow().value.clone()
    }

    pub fn with<R>(&self, f: impl FnOnce(&T) -> R) -> R {
        f(&self.0.borrow().value)
    }

    pub fn set(&self, v: T)
    where
        T: Clone,
    {
        self.0.borrow_mut().value = v;
        self.notify();
    }

    pub fn update<F: FnOnce(&mut T)>(&self, f: F)
    where
        T: Clone,
    {
        f(&mut self.0.borrow_mut().value);
        self.notify();
    }

    pub fn subscribe(&self, f: impl Fn(&T) + 'static) -> Subscription {
        let id = self.0.borrow_mut().subs.insert(Rc::new(f));
        let weak = Rc::downgrade(&self.0);
        Subscription::new(move || {
            if let Some(inner) = weak.upgrade() {
                inner.borrow_mut().subs.remove(id);
            }
        })
    }

    pub fn observer_count(&self) -> usize {
        self.0.borrow().subs.len()
    }

    /// Identity of the underlying cell, for subscription bookkeeping.
    pub fn addr(&self) -> usize {
        Rc::as_ptr(&self.0) as *const () as usize
    }

    fn notify(&self)
    where
        T: Clone,
    {
        let (value, subs) = {
            let inner = self.0.borrow();
            let subs: Vec<(SubId, Rc<dyn Fn(&T)>)> =
                inner.subs.iter().map(|(id, s)| (id, s.clone())).collect();
            (inner.value.clone(), subs)
        };
        for (id, s) in subs {
            // skip observers detached by an earlier one
            if self.0.borrow().subs.contains_key(id) {
                s(&value);
            }
        }
    }
}

impl<T> Clone for Signal<T> {
    fn clone(&self) -> Self {
        Self(self.0.clone())
    }
}

impl<T> PartialEq for Signal<T> {
    fn eq(&self, other: &Self) -> bool {
        Rc::ptr_eq(&self.0, &other.0)
    }
}

pub fn signal<T>(t: T) -> Signal<T> {
    Signal::new(t)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    #[test]
    fn observers_may_write_back_and_detach_themselves() {
        let count = signal(0u32);
        let seen = Rc::new(RefCell::new(Vec::new()));
        let own: Rc<RefCell<Option<Subscription>>> = Rc::default();

        let clamp = {
            let target = count.clone();
            count.subscribe(move |n| {
                if *n > 10 {
                    target.set(10);
                }
            })
        };
        let once = {
            let (seen, own) = (seen.clone(), own.clone());
            count.subscribe(move |n| {
                seen.borrow_mut().push(*n);
                own.borrow_mut().take();
            })
        };
        *own.borrow_mut() = Some(once);

        count.set(42);
        assert_eq!(count.get(), 10);
        assert_eq!(*seen.borrow(), vec![10]);
        assert_eq!(count.observer_count(), 1);
        drop(clamp);
        assert_eq!(count.observer_count(), 0);
    }

    #[test]
    fn dropped_subscriptions_stop_observing() {
        let s = signal("a".to_string());
        let hits = Rc::new(Cell::new(0));
        let sub = {
            let hits = hits.clone();
            s.subscribe(move |_| hits.set(hits.get() + 1))
        };
        s.update(|v| v.push('b'));
        sub.unsubscribe();
        s.set("c".into());
        assert_eq!(hits.get(), 1);
        assert_eq!(s.get(), "c");
    }
}
