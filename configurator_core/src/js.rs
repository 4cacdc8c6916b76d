// Browser plumbing: the page-supplied post function and a setTimeout-backed pacer.

use std::future::Future;
use std::time::Duration;

use js_sys::{Function, Promise};
use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::JsFuture;

use crate::bridge::{Ack, RendererChannel, SendError};
use crate::replay::Pacer;

#[wasm_bindgen]
extern "C" {
    #[wasm_bindgen(js_name = setTimeout)]
    fn set_timeout(handler: &Function, timeout_ms: i32) -> JsValue;
}

/// Renderer channel backed by a JS function, typically
/// `msg => iframe.contentWindow.postMessage(msg, "*")`.
#[derive(Clone)]
pub struct JsChannel {
    post: Function,
}

impl JsChannel {
    pub fn new(post: Function) -> Self {
        JsChannel { post }
    }
}

impl RendererChannel for JsChannel {
    fn post(&mut self, message: &str) -> Result<Ack, SendError> {
        self.post
            .call1(&JsValue::NULL, &JsValue::from_str(message))
            .map(|_| Ack)
            .map_err(|err| {
                SendError::Rejected(err.as_string().unwrap_or_else(|| format!("{:?}", err)))
            })
    }
}

/// Suspends via `setTimeout`. Works in windows and workers.
#[derive(Debug, Clone, Copy, Default)]
pub struct TimeoutPacer;

impl Pacer for TimeoutPacer {
    fn pause(&self, duration: Duration) -> impl Future<Output = ()> {
        let timeout_ms = duration.as_millis().min(i32::MAX as u128) as i32;
        let promise = Promise::new(&mut |resolve, _reject| {
            set_timeout(&resolve, timeout_ms);
        });
        async move {
            // A timer promise never rejects.
            let _ = JsFuture::from(promise).await;
        }
    }
}
