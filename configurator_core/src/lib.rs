// configurator_core: Rust/WASM core for the light configurator.
// Configuration state, cable derivation, renderer messaging and replay live here; JS is plumbing.

mod bridge;
mod cables;
mod catalog;
mod error;
mod js;
mod message;
mod replay;
mod store;
mod types;

use std::cell::RefCell;
use std::rc::Rc;

use wasm_bindgen::prelude::*;
use wasm_bindgen_futures::future_to_promise;

pub use bridge::{
    Ack, Delivery, MemoryChannel, Outbox, RendererBridge, RendererChannel, SendError,
    SyncReport,
};
pub use cables::generate_cables;
pub use catalog::{DesignCatalog, Namespace, SystemType, DEFAULT_DESIGN};
pub use error::{ConfiguratorError, Result};
pub use js::{JsChannel, TimeoutPacer};
pub use message::{
    cable_messages, change_messages, changed_scalar_messages, full_config_messages,
    scalar_messages, Field, InboundSignal, Message,
};
pub use replay::{
    Pacer, ReplayCanceller, ReplayEngine, ReplayLog, ReplayOutcome, REPLAY_INTERVAL,
    REPLAY_LOG_VERSION,
};
pub use store::{
    assign_design, change_light_amount, change_light_type, regenerate_cables, update_cable,
    update_config, Change, ConfigStore,
};
pub use types::*;

/// Initialize panic hook for better error messages in browser console.
#[wasm_bindgen(start)]
pub fn init() {
    #[cfg(feature = "console_error_panic_hook")]
    console_error_panic_hook::set_once();
}

fn to_js(err: ConfiguratorError) -> JsValue {
    JsValue::from_str(&err.to_string())
}

struct Session {
    store: ConfigStore,
    bridge: RendererBridge<JsChannel>,
}

impl Session {
    fn outbox_for(&mut self, change: &Change) -> Outbox<JsChannel> {
        let messages = change_messages(
            &change.previous,
            self.store.current(),
            change.cables_regenerated,
        );
        self.bridge.hand_off(messages)
    }
}

/// Configurator interface exposed to JavaScript.
/// The page owns the renderer iframe and hands in a post function; every update
/// is validated here and forwarded as discrete wire messages.
#[wasm_bindgen]
pub struct Configurator {
    session: Rc<RefCell<Session>>,
    replay: ReplayEngine<TimeoutPacer>,
}

#[wasm_bindgen]
impl Configurator {
    /// Create from JSON options (`{ "catalog"?: ..., "initial"?: ... }`). Empty string for defaults.
    #[wasm_bindgen(constructor)]
    pub fn new(options_json: &str) -> std::result::Result<Configurator, JsValue> {
        let options = ConfiguratorOptions::from_json(options_json).map_err(to_js)?;
        let store = ConfigStore::from_options(options).map_err(to_js)?;

        Ok(Configurator {
            session: Rc::new(RefCell::new(Session {
                store,
                bridge: RendererBridge::new(),
            })),
            replay: ReplayEngine::new(TimeoutPacer),
        })
    }

    /// Attach the renderer's post function. Replaces any previous one.
    pub fn attach_renderer(&self, post: js_sys::Function) {
        self.session.borrow_mut().bridge.attach(JsChannel::new(post));
    }

    pub fn detach_renderer(&self) {
        self.session.borrow_mut().bridge.detach();
    }

    pub fn is_attached(&self) -> bool {
        self.session.borrow().bridge.is_attached()
    }

    /// Merge a JSON patch and send what changed. Returns the number of messages posted.
    pub fn update_config(&self, patch_json: &str) -> std::result::Result<usize, JsValue> {
        let patch: ConfigPatch = serde_json::from_str(patch_json)
            .map_err(|e| to_js(ConfiguratorError::from(e)))?;
        self.commit_and_post(|store| store.apply(&patch))
    }

    pub fn set_light_type(&self, light_type: &str) -> std::result::Result<usize, JsValue> {
        let light_type: LightType = light_type.parse().map_err(to_js)?;
        self.commit_and_post(|store| store.set_light_type(light_type))
    }

    pub fn set_light_amount(&self, light_amount: u32) -> std::result::Result<usize, JsValue> {
        self.commit_and_post(|store| store.set_light_amount(light_amount))
    }

    /// Assign a design to one cable slot. Pass a system type to place a system base.
    pub fn set_cable_design(
        &self,
        index: usize,
        design: &str,
        system_type: Option<String>,
    ) -> std::result::Result<usize, JsValue> {
        self.commit_and_post(|store| store.assign_design(index, design, system_type.as_deref()))
    }

    /// Resend the whole configuration. Returns the number of messages posted.
    pub fn sync(&self) -> usize {
        let outbox = {
            let mut session = self.session.borrow_mut();
            let messages = full_config_messages(session.store.current());
            session.bridge.hand_off(messages)
        };
        outbox.post().posted
    }

    pub fn config_json(&self) -> std::result::Result<String, JsValue> {
        serde_json::to_string(self.session.borrow().store.current())
            .map_err(|e| to_js(ConfiguratorError::from(e)))
    }

    pub fn catalog_json(&self) -> std::result::Result<String, JsValue> {
        serde_json::to_string(self.session.borrow().store.catalog())
            .map_err(|e| to_js(ConfiguratorError::from(e)))
    }

    /// Record every message sent from now on.
    pub fn start_recording(&self) {
        self.session.borrow_mut().bridge.start_recording();
    }

    /// Stop recording and return a versioned replay log.
    pub fn take_recording_json(&self) -> std::result::Result<String, JsValue> {
        let messages = self.session.borrow_mut().bridge.take_recording();
        ReplayLog::new(messages).to_json().map_err(to_js)
    }

    /// Replay a stored log against the attached renderer, 100ms apart.
    /// Resolves with the number of messages sent. Rejects at once if a replay is running.
    pub fn replay(&self, log_json: &str) -> std::result::Result<js_sys::Promise, JsValue> {
        let log = ReplayLog::from_json(log_json).map_err(to_js)?;
        let session = Rc::clone(&self.session);
        let replay = self
            .replay
            .replay(log.messages, move |message| {
                let outbox = session.borrow_mut().bridge.hand_off(vec![message.clone()]);
                outbox.post();
            })
            .map_err(to_js)?;

        Ok(future_to_promise(async move {
            let outcome = replay.await;
            Ok(JsValue::from_f64(outcome.sent as f64))
        }))
    }

    /// Stop the running replay before its next message.
    pub fn cancel_replay(&self) {
        self.replay.canceller().cancel();
    }

    pub fn is_replaying(&self) -> bool {
        self.replay.is_running()
    }

    /// Whether an inbound renderer message is the `app:ready` signal.
    pub fn is_ready_signal(message: &str) -> bool {
        InboundSignal::parse(message) == Some(InboundSignal::Ready)
    }
}

impl Configurator {
    /// Run a store update, then post what changed. The session is released before posting
    /// so the page's post function may call back into the configurator.
    fn commit_and_post<F>(&self, update: F) -> std::result::Result<usize, JsValue>
    where
        F: FnOnce(&mut ConfigStore) -> Result<Change>,
    {
        let outbox = {
            let mut session = self.session.borrow_mut();
            let change = update(&mut session.store).map_err(to_js)?;
            session.outbox_for(&change)
        };
        Ok(outbox.post().posted)
    }
}
