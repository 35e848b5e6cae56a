//! A landing page wired end to end: header, hero sections gated on a
//! background video, and a gallery with autoplaying clips.

use std::time::Duration;

use unveil_core::config::{EngineConfig, MotionPolicy};
use unveil_core::geometry::Rect;
use unveil_harness::{SimHost, SimVideo, init_test_tracing};
use unveil_runtime::autoplay::{AutoplayController, MediaKind, PlaybackState};
use unveil_runtime::gated::gated_reveal;
use unveil_runtime::motion::ReducedMotion;
use unveil_runtime::readiness::MediaReadiness;
use unveil_runtime::reveal::RevealTracker;

struct Page {
    host: SimHost,
    config: EngineConfig,
}

impl Page {
    fn new(width: f64) -> Self {
        let config = EngineConfig::from_lookup(|key| match key {
            "UNVEIL_MOTION_POLICY" => Some("desktop".to_owned()),
            _ => None,
        })
        .config;
        Self {
            host: SimHost::new(width, 900.0),
            config,
        }
    }
}

#[test]
fn hero_waits_for_video_or_timeout() {
    init_test_tracing();
    let page = Page::new(390.0);
    let host = &page.host;
    let header_el = host.add_element(Rect::new(0.0, 0.0, 390.0, 300.0));
    let tracker = RevealTracker::new(host.clone());
    let header = tracker.observe(Some(&header_el), page.config.reveal());

    let video = SimVideo::new();
    let gate = MediaReadiness::track(host, page.config.media_max_wait);
    gate.bind_media(&video);
    let hero = gated_reveal(&header, &gate);

    host.flush();
    assert!(header.is_visible());
    assert!(!hero.get());

    host.advance(Duration::from_millis(1999));
    assert!(!hero.get());
    host.advance(Duration::from_millis(1));
    assert!(hero.get());
}

#[test]
fn hero_shows_as_soon_as_video_loads() {
    let page = Page::new(390.0);
    let host = &page.host;
    let header_el = host.add_element(Rect::new(0.0, 0.0, 390.0, 300.0));
    let header =
        RevealTracker::new(host.clone()).observe(Some(&header_el), page.config.reveal());
    let video = SimVideo::new();
    let gate = MediaReadiness::track(host, page.config.media_max_wait);
    gate.bind_media(&video);
    let hero = gated_reveal(&header, &gate);

    video.load_data();
    assert!(!hero.get());
    host.flush();
    assert!(hero.get());
}

#[test]
fn desktop_sections_skip_animation() {
    let page = Page::new(1280.0);
    let host = &page.host;
    let motion = ReducedMotion::new(
        host,
        page.config.desktop_breakpoint,
        page.config.motion_policy,
    );
    assert_eq!(motion.policy(), MotionPolicy::Desktop);

    let section_el = host.add_element(Rect::new(0.0, 4000.0, 1280.0, 600.0));
    let mut section = RevealTracker::new(host.clone())
        .observe(Some(&section_el), page.config.reveal().threshold(0.4));
    section.bind_reduce_motion(&motion.signal());
    assert!(section.is_visible());
    assert_eq!(host.observer_count(), 0);
}

#[test]
fn gallery_autoplays_only_videos() {
    let page = Page::new(1280.0);
    let host = &page.host;
    let controller =
        AutoplayController::with_threshold(host.clone(), page.config.autoplay_threshold);

    let items = [("video", 1000.0), ("image", 1400.0), ("Video", 1800.0)];
    let attached: Vec<_> = items
        .iter()
        .map(|(format, y)| {
            let el = host.add_element(Rect::new(0.0, *y, 600.0, 300.0));
            let video = SimVideo::new();
            let item = controller.attach_item(MediaKind::parse(format), &el, video.clone());
            (item, video)
        })
        .collect();
    assert!(attached[1].0.is_none());
    host.flush();

    // 1000..1300 fully in view, 1800..2100 not yet.
    host.scroll_to(0.0, 700.0);
    let first = attached[0].0.as_ref().map(|item| item.playback());
    let third = attached[2].0.as_ref().map(|item| item.playback());
    assert_eq!(first, Some(PlaybackState::Playing));
    assert_eq!(third, Some(PlaybackState::Paused));
    assert!(attached[0].1.is_playing());
}
