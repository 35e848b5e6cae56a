#![forbid(unsafe_code)]

//! Browser implementations of the host capability traits.
//!
//! Only compiled on `wasm32` targets.
//!
//! Every registration owns its JS closure through the returned
//! [`HostHandle`]. Canceling disconnects the browser-side registration but
//! keeps the closure alive until the handle is dropped, so a callback may
//! stop its own observation while it is running.

use std::time::Duration;

use js_sys::{Array, Function, Reflect};
use tracing::debug;
use unveil_core::config::{EngineConfig, EngineConfigParse};
use unveil_core::host::{
    CapabilityError, EventCallback, HostHandle, IntersectionCallback, IntersectionEntry,
    IntersectionHost, IntersectionOptions, MatchCallback, MediaElement, MediaQueryHost,
    PlaybackError, Scheduler, TaskCallback,
};
use unveil_core::media_query::MediaQuery;
use wasm_bindgen::JsCast;
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;
use web_sys::{
    DomException, Element, HtmlElement, HtmlVideoElement, IntersectionObserver,
    IntersectionObserverEntry, IntersectionObserverInit, MediaQueryList, MediaQueryListEvent,
    Window,
};

use crate::convert::{dataset_key, duration_from_ms, playback_error_from_name, timeout_ms};

fn host_error(err: JsValue) -> CapabilityError {
    CapabilityError::Host(err.as_string().unwrap_or_else(|| format!("{err:?}")))
}

fn function_of<T: ?Sized>(closure: &Closure<T>) -> &Function {
    closure.as_ref().unchecked_ref()
}

/// The page's `window`.
#[derive(Debug, Clone)]
pub struct WebHost {
    window: Window,
}

impl WebHost {
    /// Bind to the global `window`, if there is one.
    pub fn new() -> Result<Self, CapabilityError> {
        web_sys::window()
            .map(|window| Self { window })
            .ok_or(CapabilityError::Unsupported("window"))
    }

    fn supports(&self, name: &str) -> bool {
        Reflect::has(&self.window, &JsValue::from_str(name)).unwrap_or(false)
    }

    fn media_query_list(&self, query: &MediaQuery) -> Result<MediaQueryList, CapabilityError> {
        if !self.supports("matchMedia") {
            return Err(CapabilityError::Unsupported("matchMedia"));
        }
        self.window
            .match_media(&query.to_string())
            .map_err(host_error)?
            .ok_or(CapabilityError::Unsupported("matchMedia"))
    }
}

impl IntersectionHost for WebHost {
    type Target = Element;

    fn observe(
        &self,
        target: &Element,
        options: &IntersectionOptions,
        mut callback: IntersectionCallback,
    ) -> Result<HostHandle, CapabilityError> {
        if !self.supports("IntersectionObserver") {
            return Err(CapabilityError::Unsupported("IntersectionObserver"));
        }
        let closure = Closure::<dyn FnMut(Array, IntersectionObserver)>::new(
            move |entries: Array, _observer: IntersectionObserver| {
                for entry in entries.iter() {
                    let entry: IntersectionObserverEntry = entry.unchecked_into();
                    callback(IntersectionEntry {
                        ratio: entry.intersection_ratio().clamp(0.0, 1.0),
                        is_intersecting: entry.is_intersecting(),
                        time: duration_from_ms(entry.time()),
                    });
                }
            },
        );

        let thresholds: Array = options
            .thresholds
            .iter()
            .map(|t| JsValue::from_f64(*t))
            .collect();
        let init = IntersectionObserverInit::new();
        init.set_threshold(&thresholds);
        init.set_root_margin(&options.root_margin.to_string());

        let observer = IntersectionObserver::new_with_options(function_of(&closure), &init)
            .map_err(host_error)?;
        observer.observe(target);

        let disconnect = observer.clone();
        Ok(HostHandle::with_resources(
            move || disconnect.disconnect(),
            (observer, closure),
        ))
    }
}

impl MediaQueryHost for WebHost {
    fn matches(&self, query: &MediaQuery) -> Result<bool, CapabilityError> {
        Ok(self.media_query_list(query)?.matches())
    }

    fn listen(
        &self,
        query: &MediaQuery,
        mut callback: MatchCallback,
    ) -> Result<HostHandle, CapabilityError> {
        let list = self.media_query_list(query)?;
        let closure = Closure::<dyn FnMut(MediaQueryListEvent)>::new(
            move |event: MediaQueryListEvent| callback(event.matches()),
        );
        list.add_event_listener_with_callback("change", function_of(&closure))
            .map_err(host_error)?;

        let listener = function_of(&closure).clone();
        Ok(HostHandle::with_resources(
            move || {
                let _ = list.remove_event_listener_with_callback("change", &listener);
            },
            closure,
        ))
    }
}

impl Scheduler for WebHost {
    fn now(&self) -> Duration {
        self.window
            .performance()
            .map_or(Duration::ZERO, |perf| duration_from_ms(perf.now()))
    }

    fn set_timeout(
        &self,
        delay: Duration,
        callback: TaskCallback,
    ) -> Result<HostHandle, CapabilityError> {
        let closure: Closure<dyn FnMut()> = Closure::once(callback);
        let id = self
            .window
            .set_timeout_with_callback_and_timeout_and_arguments_0(
                function_of(&closure),
                timeout_ms(delay),
            )
            .map_err(host_error)?;
        let window = self.window.clone();
        Ok(HostHandle::with_resources(
            move || window.clear_timeout_with_handle(id),
            closure,
        ))
    }

    fn request_frame(&self, callback: TaskCallback) -> Result<HostHandle, CapabilityError> {
        let closure: Closure<dyn FnMut(f64)> = Closure::once(move |_timestamp: f64| callback());
        let id = self
            .window
            .request_animation_frame(function_of(&closure))
            .map_err(host_error)?;
        let window = self.window.clone();
        Ok(HostHandle::with_resources(
            move || {
                let _ = window.cancel_animation_frame(id);
            },
            closure,
        ))
    }
}

// ---------------------------------------------------------------------------
// Video
// ---------------------------------------------------------------------------

/// A `<video>` element.
#[derive(Debug, Clone)]
pub struct WebVideo {
    element: HtmlVideoElement,
}

impl WebVideo {
    #[must_use]
    pub fn new(element: HtmlVideoElement) -> Self {
        Self { element }
    }

    /// Wrap `element` if it is a `<video>`.
    #[must_use]
    pub fn from_element(element: Element) -> Option<Self> {
        element.dyn_into::<HtmlVideoElement>().ok().map(Self::new)
    }

    #[must_use]
    pub fn element(&self) -> &HtmlVideoElement {
        &self.element
    }
}

fn playback_error(err: &JsValue) -> PlaybackError {
    match err.dyn_ref::<DomException>() {
        Some(exception) => playback_error_from_name(&exception.name()),
        None => PlaybackError::Other(err.as_string().unwrap_or_default()),
    }
}

impl MediaElement for WebVideo {
    /// Starts playback. A promise that rejects later (autoplay policy) is
    /// logged and otherwise ignored.
    fn play(&self) -> Result<(), PlaybackError> {
        let promise = self.element.play().map_err(|err| playback_error(&err))?;
        wasm_bindgen_futures::spawn_local(async move {
            if let Err(err) = JsFuture::from(promise).await {
                debug!(error = %playback_error(&err), "play promise rejected");
            }
        });
        Ok(())
    }

    fn pause(&self) {
        let _ = self.element.pause();
    }

    fn seek(&self, position: Duration) {
        self.element.set_current_time(position.as_secs_f64());
    }

    fn on_data_loaded(&self, mut callback: EventCallback) -> Result<HostHandle, CapabilityError> {
        let closure = Closure::<dyn FnMut()>::new(move || callback());
        self.element
            .add_event_listener_with_callback("loadeddata", function_of(&closure))
            .map_err(host_error)?;
        let element = self.element.clone();
        let listener = function_of(&closure).clone();
        Ok(HostHandle::with_resources(
            move || {
                let _ = element.remove_event_listener_with_callback("loadeddata", &listener);
            },
            closure,
        ))
    }
}

// ---------------------------------------------------------------------------
// Configuration
// ---------------------------------------------------------------------------

/// Read engine configuration from `data-unveil-*` attributes on `element`.
pub fn config_from_dataset(element: &HtmlElement) -> EngineConfigParse {
    let dataset = element.dataset();
    EngineConfig::from_lookup(|var| dataset.get(&dataset_key(var)))
}
