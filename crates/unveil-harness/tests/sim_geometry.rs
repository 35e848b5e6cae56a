//! Geometry-driven delivery through `SimHost`.

use std::cell::RefCell;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use unveil_core::geometry::{Rect, RootMargin};
use unveil_core::host::{IntersectionEntry, IntersectionHost, IntersectionOptions};
use unveil_harness::{SimHost, init_test_tracing};

fn observe_log(
    host: &SimHost,
    el: &unveil_harness::SimElement,
    options: IntersectionOptions,
) -> (Rc<RefCell<Vec<IntersectionEntry>>>, unveil_core::HostHandle) {
    let log = Rc::new(RefCell::new(Vec::new()));
    let sink = Rc::clone(&log);
    let handle = host
        .observe(el, &options, Box::new(move |e| sink.borrow_mut().push(e)))
        .unwrap();
    (log, handle)
}

#[test]
fn bottom_margin_delays_trigger() {
    init_test_tracing();
    // 1000px tall viewport, bottom quarter excluded from the root.
    let host = SimHost::new(800.0, 1000.0);
    let el = host.add_element(Rect::new(0.0, 1200.0, 800.0, 100.0));
    let margin: RootMargin = "0px 0px -25% 0px".parse().unwrap();
    let (log, _h) = observe_log(&host, &el, IntersectionOptions::new(0.4).root_margin(margin));
    host.flush();

    // Element top at 800 in view: inside the viewport, outside the shrunk root.
    host.scroll_to(0.0, 400.0);
    // Element at 700..800 in view: half in the root (root ends at 750).
    host.scroll_to(0.0, 500.0);

    let seen: Vec<(bool, f64)> = log
        .borrow()
        .iter()
        .map(|e| (e.is_intersecting, e.ratio))
        .collect();
    assert_eq!(seen, vec![(false, 0.0), (true, 0.5)]);
}

#[test]
fn removed_element_reports_not_intersecting() {
    let host = SimHost::new(100.0, 100.0);
    let el = host.add_element(Rect::new(0.0, 0.0, 50.0, 50.0));
    let (log, _h) = observe_log(&host, &el, IntersectionOptions::new(0.1));
    host.flush();
    host.remove_element(el);
    host.flush();
    let last = *log.borrow().last().unwrap();
    assert!(!last.is_intersecting);
    assert_eq!(log.borrow().len(), 2);
}

#[test]
fn clock_only_moves_when_driven() {
    let host = SimHost::new(10.0, 10.0);
    assert_eq!(host.now(), std::time::Duration::ZERO);
    host.flush();
    host.next_frame();
    assert_eq!(host.now(), std::time::Duration::ZERO);
    host.advance(std::time::Duration::from_millis(16));
    assert_eq!(host.now(), std::time::Duration::from_millis(16));
}
