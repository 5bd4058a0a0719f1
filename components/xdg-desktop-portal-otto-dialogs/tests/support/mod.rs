#![allow(dead_code)]

use std::collections::{HashMap, HashSet};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use xdg_desktop_portal_otto_dialogs::dialog::{Dialog, OutcomeSender};
use xdg_desktop_portal_otto_dialogs::error::ExportError;
use xdg_desktop_portal_otto_dialogs::request::{RequestBus, RequestObject, ResponseCode, Results};
use zbus::zvariant::{ObjectPath, OwnedValue};

/// A `Response` signal captured by [`RecordingBus`].
#[derive(Debug)]
pub struct Signal {
    pub destination: String,
    pub path: String,
    pub code: u32,
    pub results: Results,
}

impl Signal {
    pub fn string(&self, key: &str) -> Option<String> {
        self.results
            .get(key)
            .and_then(|value| value.try_clone().ok())
            .and_then(|value| String::try_from(value).ok())
    }
}

#[derive(Default)]
struct BusState {
    objects: HashMap<String, RequestObject>,
    rejected: HashSet<String>,
    unregistered: Vec<String>,
    signals: Vec<Signal>,
}

/// In-memory bus that records registrations and signals.
#[derive(Clone, Default)]
pub struct RecordingBus {
    state: Arc<Mutex<BusState>>,
}

impl RecordingBus {
    /// Makes every later registration at `path` fail.
    pub fn reject(&self, path: &str) {
        self.state.lock().unwrap().rejected.insert(path.to_string());
    }

    pub fn is_registered(&self, path: &str) -> bool {
        self.state.lock().unwrap().objects.contains_key(path)
    }

    pub fn registered(&self) -> usize {
        self.state.lock().unwrap().objects.len()
    }

    pub fn unregistered(&self) -> Vec<String> {
        self.state.lock().unwrap().unregistered.clone()
    }

    pub fn signal_count(&self) -> usize {
        self.state.lock().unwrap().signals.len()
    }

    pub fn take_signals(&self) -> Vec<Signal> {
        std::mem::take(&mut self.state.lock().unwrap().signals)
    }

    /// Plays the frontend calling `Close` on the object at `path`.
    ///
    /// Returns false when nothing is registered there.
    pub fn close(&self, path: &str) -> bool {
        let state = self.state.lock().unwrap();
        match state.objects.get(path) {
            Some(object) => {
                object.notify_close();
                true
            }
            None => false,
        }
    }
}

impl RequestBus for RecordingBus {
    async fn register(&self, path: &str, object: RequestObject) -> Result<(), ExportError> {
        ObjectPath::try_from(path).map_err(|source| ExportError::InvalidPath {
            path: path.to_string(),
            source,
        })?;

        let mut state = self.state.lock().unwrap();
        if state.rejected.contains(path) || state.objects.contains_key(path) {
            return Err(ExportError::PathInUse(path.to_string()));
        }
        state.objects.insert(path.to_string(), object);
        Ok(())
    }

    async fn unregister(&self, path: &str) -> Result<bool, ExportError> {
        let mut state = self.state.lock().unwrap();
        state.unregistered.push(path.to_string());
        Ok(state.objects.remove(path).is_some())
    }

    async fn emit_response(
        &self,
        destination: &str,
        path: &str,
        code: ResponseCode,
        results: &Results,
    ) -> zbus::Result<()> {
        let results = results
            .iter()
            .map(|(key, value)| Ok((key.clone(), value.try_clone()?)))
            .collect::<Result<HashMap<String, OwnedValue>, zbus::zvariant::Error>>()?;

        self.state.lock().unwrap().signals.push(Signal {
            destination: destination.to_string(),
            path: path.to_string(),
            code: code.into(),
            results,
        });
        Ok(())
    }
}

/// Observes a [`FakeDialog`] from the test body.
#[derive(Clone, Default)]
pub struct DialogProbe {
    outcome: Arc<Mutex<Option<OutcomeSender>>>,
    presented: Arc<AtomicUsize>,
    closed: Arc<AtomicUsize>,
}

impl DialogProbe {
    pub fn dialog(&self) -> Box<dyn Dialog> {
        Box::new(FakeDialog {
            probe: self.clone(),
        })
    }

    /// The sender handed to the dialog when it was presented.
    pub fn take_outcome(&self) -> OutcomeSender {
        self.outcome
            .lock()
            .unwrap()
            .take()
            .expect("dialog was not presented")
    }

    pub fn presented(&self) -> usize {
        self.presented.load(Ordering::SeqCst)
    }

    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::SeqCst)
    }
}

/// Dialog whose answer is given by the test.
pub struct FakeDialog {
    probe: DialogProbe,
}

impl Dialog for FakeDialog {
    fn present(&mut self, outcome: OutcomeSender) {
        self.probe.presented.fetch_add(1, Ordering::SeqCst);
        *self.probe.outcome.lock().unwrap() = Some(outcome);
    }

    fn close(self: Box<Self>) {
        self.probe.closed.fetch_add(1, Ordering::SeqCst);
    }
}
