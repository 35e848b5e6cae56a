#![forbid(unsafe_code)]

//! Deterministic simulated host.
//!
//! [`SimHost`] implements every capability trait against an in-memory
//! document: elements are rectangles in document coordinates, the viewport
//! is a scrollable window onto them, and time only moves when the test says
//! so.
//!
//! # Delivery Model
//!
//! Like a browser, the host never calls back synchronously from a
//! registration. Reports are queued and delivered by the driving calls:
//! [`flush`](SimHost::flush), [`scroll_to`](SimHost::scroll_to),
//! [`resize`](SimHost::resize), [`advance`](SimHost::advance) and
//! [`next_frame`](SimHost::next_frame).
//!
//! - A new intersection observer receives one initial report on the next
//!   delivery.
//! - After that, a report is sent only when the target's ratio moves to a
//!   different threshold bucket.
//! - Timers fire in `(due, registration)` order with the clock set to their
//!   due time.
//! - Frame callbacks requested while frames run wait for the next frame.
//!
//! Every callback runs with no internal borrow held, so callbacks may
//! register, cancel, or drive the host re-entrantly.

use std::cell::RefCell;
use std::collections::{BTreeMap, VecDeque};
use std::fmt;
use std::rc::{Rc, Weak};
use std::time::Duration;

use tracing::trace;
use unveil_core::geometry::{Rect, intersection_ratio};
use unveil_core::host::{
    CapabilityError, HostHandle, IntersectionCallback, IntersectionEntry, IntersectionHost,
    IntersectionOptions, MatchCallback, MediaQueryHost, Scheduler, TaskCallback,
};
use unveil_core::media_query::MediaQuery;

/// Element reference inside a [`SimHost`] document.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SimElement(pub u64);

/// Which capabilities the simulated environment provides.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SimCapabilities {
    pub intersection: bool,
    pub media_query: bool,
    pub timers: bool,
    pub frames: bool,
    /// When `false`, canceling a registration does nothing and stale
    /// callbacks keep firing (models a leaky host).
    pub honor_cancellation: bool,
}

impl Default for SimCapabilities {
    fn default() -> Self {
        Self {
            intersection: true,
            media_query: true,
            timers: true,
            frames: true,
            honor_cancellation: true,
        }
    }
}

impl SimCapabilities {
    /// Nothing but the clock.
    #[must_use]
    pub fn bare() -> Self {
        Self {
            intersection: false,
            media_query: false,
            timers: false,
            frames: false,
            honor_cancellation: true,
        }
    }
}

struct ObserverSlot {
    target: SimElement,
    options: IntersectionOptions,
    callback: Option<IntersectionCallback>,
    /// Threshold bucket of the last delivered report.
    last_bucket: Option<Option<usize>>,
}

struct ListenerSlot {
    query: MediaQuery,
    last: bool,
    callback: Option<MatchCallback>,
}

struct TimerSlot {
    due: Duration,
    callback: TaskCallback,
}

type Released = Box<dyn std::any::Any>;

struct World {
    now: Duration,
    viewport: (f64, f64),
    scroll: (f64, f64),
    prefers_reduced_motion: bool,
    caps: SimCapabilities,
    next_id: u64,
    elements: BTreeMap<SimElement, Rect>,
    observers: BTreeMap<u64, ObserverSlot>,
    listeners: BTreeMap<u64, ListenerSlot>,
    timers: BTreeMap<u64, TimerSlot>,
    frames: BTreeMap<u64, TaskCallback>,
    pending: VecDeque<(u64, IntersectionEntry)>,
}

impl World {
    fn next_id(&mut self) -> u64 {
        self.next_id += 1;
        self.next_id
    }

    fn root(&self) -> Rect {
        Rect::new(0.0, 0.0, self.viewport.0, self.viewport.1)
    }

    fn entry_for(&self, slot: &ObserverSlot) -> IntersectionEntry {
        let Some(rect) = self.elements.get(&slot.target) else {
            return IntersectionEntry {
                ratio: 0.0,
                is_intersecting: false,
                time: self.now,
            };
        };
        let in_view = rect.offset(-self.scroll.0, -self.scroll.1);
        match intersection_ratio(&in_view, &self.root(), &slot.options.root_margin) {
            Some(ratio) => IntersectionEntry {
                ratio,
                is_intersecting: true,
                time: self.now,
            },
            None => IntersectionEntry {
                ratio: 0.0,
                is_intersecting: false,
                time: self.now,
            },
        }
    }

    /// Queue a report for every observer whose bucket changed.
    fn recompute(&mut self) {
        let mut queued = Vec::new();
        for (&id, slot) in &self.observers {
            let entry = self.entry_for(slot);
            let bucket = bucket(&slot.options.thresholds, &entry);
            if slot.last_bucket != Some(bucket) {
                queued.push((id, bucket, entry));
            }
        }
        for (id, bucket, entry) in queued {
            if let Some(slot) = self.observers.get_mut(&id) {
                slot.last_bucket = Some(bucket);
            }
            self.pending.push_back((id, entry));
        }
    }
}

/// Index of the highest threshold the entry has reached, or `None` when the
/// target does not intersect at all.
fn bucket(thresholds: &[f64], entry: &IntersectionEntry) -> Option<usize> {
    if !entry.is_intersecting {
        return None;
    }
    Some(thresholds.iter().filter(|&&t| entry.ratio >= t).count())
}

/// Simulated browser environment. Clones share one world.
#[derive(Clone)]
pub struct SimHost {
    world: Rc<RefCell<World>>,
}

impl fmt::Debug for SimHost {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let world = self.world.borrow();
        f.debug_struct("SimHost")
            .field("now", &world.now)
            .field("viewport", &world.viewport)
            .field("scroll", &world.scroll)
            .field("observers", &world.observers.len())
            .field("listeners", &world.listeners.len())
            .field("timers", &world.timers.len())
            .finish_non_exhaustive()
    }
}

impl SimHost {
    /// A host with a `width` x `height` viewport and every capability.
    #[must_use]
    pub fn new(width: f64, height: f64) -> Self {
        Self::with_capabilities(width, height, SimCapabilities::default())
    }

    #[must_use]
    pub fn with_capabilities(width: f64, height: f64, caps: SimCapabilities) -> Self {
        Self {
            world: Rc::new(RefCell::new(World {
                now: Duration::ZERO,
                viewport: (width.max(0.0), height.max(0.0)),
                scroll: (0.0, 0.0),
                prefers_reduced_motion: false,
                caps,
                next_id: 0,
                elements: BTreeMap::new(),
                observers: BTreeMap::new(),
                listeners: BTreeMap::new(),
                timers: BTreeMap::new(),
                frames: BTreeMap::new(),
                pending: VecDeque::new(),
            })),
        }
    }

    // -- document ---------------------------------------------------------

    /// Insert an element at `rect` (document coordinates).
    pub fn add_element(&self, rect: Rect) -> SimElement {
        let mut world = self.world.borrow_mut();
        let element = SimElement(world.next_id());
        world.elements.insert(element, rect);
        world.recompute();
        element
    }

    pub fn move_element(&self, element: SimElement, rect: Rect) {
        let mut world = self.world.borrow_mut();
        world.elements.insert(element, rect);
        world.recompute();
    }

    /// Remove an element. Observers of it see a non-intersecting report.
    pub fn remove_element(&self, element: SimElement) {
        let mut world = self.world.borrow_mut();
        world.elements.remove(&element);
        world.recompute();
    }

    // -- environment ------------------------------------------------------

    /// Scroll the viewport and deliver resulting reports.
    pub fn scroll_to(&self, x: f64, y: f64) {
        {
            let mut world = self.world.borrow_mut();
            world.scroll = (x, y);
            world.recompute();
        }
        self.flush();
    }

    /// Resize the viewport, notify media-query listeners whose result
    /// flipped, and deliver resulting intersection reports.
    pub fn resize(&self, width: f64, height: f64) {
        self.world.borrow_mut().viewport = (width.max(0.0), height.max(0.0));
        self.notify_listeners();
        self.world.borrow_mut().recompute();
        self.flush();
    }

    pub fn set_prefers_reduced_motion(&self, prefers: bool) {
        self.world.borrow_mut().prefers_reduced_motion = prefers;
        self.notify_listeners();
    }

    // -- time -------------------------------------------------------------

    /// Move the clock forward, firing due timers in order.
    pub fn advance(&self, dt: Duration) {
        let target = self.world.borrow().now + dt;
        loop {
            let next = {
                let mut world = self.world.borrow_mut();
                let due = world
                    .timers
                    .iter()
                    .filter(|(_, slot)| slot.due <= target)
                    .min_by_key(|(id, slot)| (slot.due, **id))
                    .map(|(id, _)| *id);
                due.and_then(|id| world.timers.remove(&id)).map(|slot| {
                    world.now = world.now.max(slot.due);
                    slot.callback
                })
            };
            match next {
                Some(callback) => {
                    trace!("sim timer fired");
                    callback();
                }
                None => break,
            }
        }
        self.world.borrow_mut().now = target;
        self.flush();
    }

    /// Run the frame callbacks queued so far.
    pub fn next_frame(&self) {
        let frames: Vec<TaskCallback> = {
            let mut world = self.world.borrow_mut();
            std::mem::take(&mut world.frames).into_values().collect()
        };
        for frame in frames {
            frame();
        }
        self.flush();
    }

    /// Deliver queued intersection reports.
    pub fn flush(&self) {
        loop {
            let next = self.world.borrow_mut().pending.pop_front();
            let Some((id, entry)) = next else {
                break;
            };
            self.dispatch(id, entry);
        }
    }

    /// Deliver a report with an explicit ratio to every observer of
    /// `element`, bypassing geometry.
    pub fn deliver(&self, element: SimElement, ratio: f64) {
        let (ids, now) = {
            let world = self.world.borrow();
            let ids: Vec<u64> = world
                .observers
                .iter()
                .filter(|(_, slot)| slot.target == element)
                .map(|(id, _)| *id)
                .collect();
            (ids, world.now)
        };
        for id in ids {
            self.dispatch(id, IntersectionEntry::from_ratio(ratio, now));
        }
    }

    fn dispatch(&self, id: u64, entry: IntersectionEntry) {
        let callback = self
            .world
            .borrow_mut()
            .observers
            .get_mut(&id)
            .and_then(|slot| slot.callback.take());
        let Some(mut callback) = callback else {
            return;
        };
        trace!(id, ratio = entry.ratio, "sim intersection report");
        callback(entry);
        let leftover = {
            let mut world = self.world.borrow_mut();
            match world.observers.get_mut(&id) {
                Some(slot) => {
                    slot.callback = Some(callback);
                    None
                }
                None => Some(callback),
            }
        };
        drop(leftover);
    }

    fn notify_listeners(&self) {
        let flipped: Vec<(u64, bool)> = {
            let mut world = self.world.borrow_mut();
            let (width, prefers) = (world.viewport.0, world.prefers_reduced_motion);
            world
                .listeners
                .iter_mut()
                .filter_map(|(id, slot)| {
                    let now = slot.query.evaluate(width, prefers);
                    (now != slot.last).then(|| {
                        slot.last = now;
                        (*id, now)
                    })
                })
                .collect()
        };
        for (id, matches) in flipped {
            let callback = self
                .world
                .borrow_mut()
                .listeners
                .get_mut(&id)
                .and_then(|slot| slot.callback.take());
            let Some(mut callback) = callback else {
                continue;
            };
            callback(matches);
            let leftover = {
                let mut world = self.world.borrow_mut();
                match world.listeners.get_mut(&id) {
                    Some(slot) => {
                        slot.callback = Some(callback);
                        None
                    }
                    None => Some(callback),
                }
            };
            drop(leftover);
        }
    }

    // -- inspection -------------------------------------------------------

    #[must_use]
    pub fn now(&self) -> Duration {
        self.world.borrow().now
    }

    #[must_use]
    pub fn viewport(&self) -> (f64, f64) {
        self.world.borrow().viewport
    }

    #[must_use]
    pub fn observer_count(&self) -> usize {
        self.world.borrow().observers.len()
    }

    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.world.borrow().listeners.len()
    }

    #[must_use]
    pub fn pending_timers(&self) -> usize {
        self.world.borrow().timers.len()
    }

    #[must_use]
    pub fn pending_frames(&self) -> usize {
        self.world.borrow().frames.len()
    }

    /// Handle whose cancel runs `remove` unless the host ignores cancels.
    /// Whatever `remove` returns is dropped after the world is released.
    fn release(&self, remove: impl FnOnce(&mut World) -> Option<Released> + 'static) -> HostHandle {
        let weak: Weak<RefCell<World>> = Rc::downgrade(&self.world);
        HostHandle::new(move || {
            let Some(world) = weak.upgrade() else {
                return;
            };
            let removed = {
                let mut world = world.borrow_mut();
                if !world.caps.honor_cancellation {
                    return;
                }
                remove(&mut world)
            };
            drop(removed);
        })
    }
}

impl IntersectionHost for SimHost {
    type Target = SimElement;

    fn observe(
        &self,
        target: &SimElement,
        options: &IntersectionOptions,
        callback: IntersectionCallback,
    ) -> Result<HostHandle, CapabilityError> {
        let id = {
            let mut world = self.world.borrow_mut();
            if !world.caps.intersection {
                return Err(CapabilityError::Unsupported("IntersectionObserver"));
            }
            let id = world.next_id();
            let slot = ObserverSlot {
                target: *target,
                options: options.clone(),
                callback: Some(callback),
                last_bucket: None,
            };
            let entry = world.entry_for(&slot);
            let bucket = bucket(&slot.options.thresholds, &entry);
            let slot = ObserverSlot {
                last_bucket: Some(bucket),
                ..slot
            };
            world.observers.insert(id, slot);
            world.pending.push_back((id, entry));
            id
        };
        Ok(self.release(move |world| {
            world.pending.retain(|(pending, _)| *pending != id);
            world
                .observers
                .remove(&id)
                .map(|slot| Box::new(slot.callback) as Released)
        }))
    }
}

impl MediaQueryHost for SimHost {
    fn matches(&self, query: &MediaQuery) -> Result<bool, CapabilityError> {
        let world = self.world.borrow();
        if !world.caps.media_query {
            return Err(CapabilityError::Unsupported("matchMedia"));
        }
        Ok(query.evaluate(world.viewport.0, world.prefers_reduced_motion))
    }

    fn listen(
        &self,
        query: &MediaQuery,
        callback: MatchCallback,
    ) -> Result<HostHandle, CapabilityError> {
        let id = {
            let mut world = self.world.borrow_mut();
            if !world.caps.media_query {
                return Err(CapabilityError::Unsupported("matchMedia"));
            }
            let id = world.next_id();
            let last = query.evaluate(world.viewport.0, world.prefers_reduced_motion);
            world.listeners.insert(
                id,
                ListenerSlot {
                    query: *query,
                    last,
                    callback: Some(callback),
                },
            );
            id
        };
        Ok(self.release(move |world| {
            world
                .listeners
                .remove(&id)
                .map(|slot| Box::new(slot.callback) as Released)
        }))
    }
}

impl Scheduler for SimHost {
    fn now(&self) -> Duration {
        self.world.borrow().now
    }

    fn set_timeout(
        &self,
        delay: Duration,
        callback: TaskCallback,
    ) -> Result<HostHandle, CapabilityError> {
        let id = {
            let mut world = self.world.borrow_mut();
            if !world.caps.timers {
                return Err(CapabilityError::Unsupported("setTimeout"));
            }
            let id = world.next_id();
            let due = world.now + delay;
            world.timers.insert(id, TimerSlot { due, callback });
            id
        };
        Ok(self.release(move |world| {
            world
                .timers
                .remove(&id)
                .map(|slot| Box::new(slot.callback) as Released)
        }))
    }

    fn request_frame(&self, callback: TaskCallback) -> Result<HostHandle, CapabilityError> {
        let id = {
            let mut world = self.world.borrow_mut();
            if !world.caps.frames {
                return Err(CapabilityError::Unsupported("requestAnimationFrame"));
            }
            let id = world.next_id();
            world.frames.insert(id, callback);
            id
        };
        Ok(self.release(move |world| {
            world
                .frames
                .remove(&id)
                .map(|callback| Box::new(callback) as Released)
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use std::cell::Cell;

    fn recorder() -> (Rc<RefCell<Vec<f64>>>, IntersectionCallback) {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        let callback = Box::new(move |e: IntersectionEntry| sink.borrow_mut().push(e.ratio));
        (log, callback)
    }

    #[test]
    fn initial_report_is_deferred_until_flush() {
        let host = SimHost::new(100.0, 100.0);
        let el = host.add_element(Rect::new(0.0, 0.0, 10.0, 10.0));
        let (log, cb) = recorder();
        let _h = host.observe(&el, &IntersectionOptions::new(0.5), cb).unwrap();
        assert!(log.borrow().is_empty());
        host.flush();
        assert_eq!(*log.borrow(), vec![1.0]);
    }

    #[test]
    fn reports_only_on_bucket_change() {
        let host = SimHost::new(100.0, 100.0);
        let el = host.add_element(Rect::new(0.0, 150.0, 10.0, 100.0));
        let (log, cb) = recorder();
        let _h = host.observe(&el, &IntersectionOptions::new(0.5), cb).unwrap();
        host.flush();
        host.scroll_to(0.0, 60.0); // 10% visible: intersecting, below threshold
        host.scroll_to(0.0, 70.0); // 20%: same bucket
        host.scroll_to(0.0, 120.0); // 70%: crosses
        assert_eq!(*log.borrow(), vec![0.0, 0.1, 0.7]);
    }

    #[test]
    fn canceled_observer_is_silent() {
        let host = SimHost::new(100.0, 100.0);
        let el = host.add_element(Rect::new(0.0, 0.0, 10.0, 10.0));
        let (log, cb) = recorder();
        let handle = host.observe(&el, &IntersectionOptions::new(0.5), cb).unwrap();
        drop(handle);
        host.flush();
        host.deliver(el, 1.0);
        assert!(log.borrow().is_empty());
        assert_eq!(host.observer_count(), 0);
    }

    #[test]
    fn leaky_host_keeps_delivering() {
        let caps = SimCapabilities {
            honor_cancellation: false,
            ..SimCapabilities::default()
        };
        let host = SimHost::with_capabilities(100.0, 100.0, caps);
        let el = host.add_element(Rect::new(0.0, 0.0, 10.0, 10.0));
        let (log, cb) = recorder();
        drop(host.observe(&el, &IntersectionOptions::new(0.5), cb).unwrap());
        host.deliver(el, 0.3);
        assert_eq!(*log.borrow(), vec![0.3]);
    }

    #[test]
    fn timers_fire_in_due_order_at_due_time() {
        let host = SimHost::new(10.0, 10.0);
        let log = Rc::new(RefCell::new(Vec::new()));
        let mut handles = Vec::new();
        for ms in [30u64, 10, 20] {
            let sink = Rc::clone(&log);
            let clock = host.clone();
            handles.push(
                host.set_timeout(
                    Duration::from_millis(ms),
                    Box::new(move || sink.borrow_mut().push(clock.now().as_millis())),
                )
                .unwrap(),
            );
        }
        host.advance(Duration::from_millis(25));
        assert_eq!(*log.borrow(), vec![10, 20]);
        host.advance(Duration::from_millis(5));
        assert_eq!(*log.borrow(), vec![10, 20, 30]);
        assert_eq!(host.pending_timers(), 0);
    }

    #[test]
    fn listeners_fire_only_on_flip() {
        let host = SimHost::new(500.0, 800.0);
        let count = Rc::new(Cell::new(0u32));
        let c = Rc::clone(&count);
        let _h = host
            .listen(
                &MediaQuery::MinWidth(768),
                Box::new(move |_| c.set(c.get() + 1)),
            )
            .unwrap();
        host.resize(600.0, 800.0);
        host.resize(900.0, 800.0);
        host.resize(1000.0, 800.0);
        assert_eq!(count.get(), 1);
    }

    #[test]
    fn frames_requested_during_a_frame_wait() {
        let host = SimHost::new(10.0, 10.0);
        let ran = Rc::new(Cell::new(0u32));
        let (r, h) = (Rc::clone(&ran), host.clone());
        let inner = Rc::new(RefCell::new(None));
        let keep = Rc::clone(&inner);
        let _outer = host
            .request_frame(Box::new(move || {
                r.set(r.get() + 1);
                let r2 = Rc::clone(&r);
                *keep.borrow_mut() = h
                    .request_frame(Box::new(move || r2.set(r2.get() + 1)))
                    .ok();
            }))
            .unwrap();
        host.next_frame();
        assert_eq!(ran.get(), 1);
        assert_eq!(host.pending_frames(), 1);
        host.next_frame();
        assert_eq!(ran.get(), 2);
    }

    #[test]
    fn missing_capabilities_are_errors() {
        let host = SimHost::with_capabilities(10.0, 10.0, SimCapabilities::bare());
        let el = host.add_element(Rect::new(0.0, 0.0, 1.0, 1.0));
        assert!(matches!(
            host.observe(&el, &IntersectionOptions::new(0.1), Box::new(|_| {})),
            Err(CapabilityError::Unsupported(_))
        ));
        assert!(host.matches(&MediaQuery::MinWidth(1)).is_err());
        assert!(host.set_timeout(Duration::ZERO, Box::new(|| {})).is_err());
        assert!(host.request_frame(Box::new(|| {})).is_err());
    }
}
