//! Single-consumer loop that owns every open dialog and ends each one once.

use std::collections::HashMap;

use tokio::sync::{mpsc, oneshot};
use tracing::{debug, info, warn};

use crate::dialog::{Delivery, Dialog, DialogId, OutcomeSender, Termination};
use crate::error::DispatchError;
use crate::request::{Request, RequestBus, ResponseCode, Results};

/// One open interaction: the request, its UI surface and how to answer.
pub struct DialogHandle<B: RequestBus> {
    pub request: Request<B>,
    pub dialog: Box<dyn Dialog>,
    pub delivery: Delivery,
}

struct Open<B: RequestBus> {
    handle: DialogHandle<B>,
    bus: B,
    ready: oneshot::Sender<DialogId>,
}

/// Cloneable entry point used by the portal adapters.
pub struct DispatcherHandle<B: RequestBus> {
    opens: mpsc::UnboundedSender<Open<B>>,
}

impl<B: RequestBus> Clone for DispatcherHandle<B> {
    fn clone(&self) -> Self {
        Self {
            opens: self.opens.clone(),
        }
    }
}

impl<B: RequestBus> DispatcherHandle<B> {
    /// Presents `dialog` and exports `request` on `bus`.
    ///
    /// Resolves once the request is exported (or failed to export), so the
    /// adapter can complete the portal call afterwards. The answer goes out as
    /// a `Response` signal.
    pub async fn open(
        &self,
        request: Request<B>,
        dialog: Box<dyn Dialog>,
        bus: B,
    ) -> Result<DialogId, DispatchError> {
        self.submit(request, dialog, Delivery::Signal, bus).await
    }

    /// Like [`DispatcherHandle::open`], but waits for the answer and returns
    /// it instead of signalling it. A `Close` answers with
    /// [`ResponseCode::Other`].
    pub async fn open_with_reply(
        &self,
        request: Request<B>,
        dialog: Box<dyn Dialog>,
        bus: B,
    ) -> Result<(ResponseCode, Results), DispatchError> {
        let (reply, answer) = oneshot::channel();
        self.submit(request, dialog, Delivery::Reply(reply), bus)
            .await?;
        answer.await.map_err(|_| DispatchError::NoAnswer)
    }

    async fn submit(
        &self,
        request: Request<B>,
        dialog: Box<dyn Dialog>,
        delivery: Delivery,
        bus: B,
    ) -> Result<DialogId, DispatchError> {
        let (ready, opened) = oneshot::channel();
        let open = Open {
            handle: DialogHandle {
                request,
                dialog,
                delivery,
            },
            bus,
            ready,
        };

        self.opens.send(open).map_err(|_| DispatchError::Stopped)?;
        opened.await.map_err(|_| DispatchError::Stopped)
    }
}

/// Owner of all open dialogs.
///
/// Opens and terminations are processed strictly one after the other, so the
/// termination routine for a dialog runs to completion before any later event
/// for it is looked at.
pub struct Dispatcher<B: RequestBus> {
    opens: mpsc::UnboundedReceiver<Open<B>>,
    terminations: mpsc::UnboundedReceiver<Termination>,
    termination_sender: mpsc::UnboundedSender<Termination>,
    handles: HashMap<DialogId, DialogHandle<B>>,
    next_id: u64,
}

impl<B: RequestBus> Dispatcher<B> {
    pub fn new() -> (Self, DispatcherHandle<B>) {
        let (open_sender, opens) = mpsc::unbounded_channel();
        let (termination_sender, terminations) = mpsc::unbounded_channel();

        let dispatcher = Self {
            opens,
            terminations,
            termination_sender,
            handles: HashMap::new(),
            next_id: 0,
        };

        (dispatcher, DispatcherHandle { opens: open_sender })
    }

    /// Number of dialogs that have not terminated yet.
    pub fn open_dialogs(&self) -> usize {
        self.handles.len()
    }

    /// Runs until every [`DispatcherHandle`] is dropped.
    pub async fn run(mut self) {
        while self.step().await {}
        info!(
            open_dialogs = self.handles.len(),
            "Dialog dispatcher stopped"
        );
    }

    /// Processes a single event, terminations first.
    ///
    /// Returns `false` once no more dialogs can be opened.
    pub async fn step(&mut self) -> bool {
        tokio::select! {
            biased;

            Some(termination) = self.terminations.recv() => {
                self.terminate(termination).await;
                true
            }
            open = self.opens.recv() => match open {
                Some(open) => {
                    self.open(open).await;
                    true
                }
                None => false,
            },
        }
    }

    async fn open(&mut self, open: Open<B>) {
        let Open {
            mut handle,
            bus,
            ready,
        } = open;

        let id = DialogId(self.next_id);
        self.next_id += 1;

        let closes = self.termination_sender.clone();
        handle.request.on_close_requested(move || {
            if closes.send(Termination::CloseRequested { id }).is_err() {
                warn!(dialog = %id, "Dispatcher is gone, dropping close request");
            }
        });

        handle
            .dialog
            .present(OutcomeSender::new(id, self.termination_sender.clone()));
        handle.request.export(&bus).await;

        info!(
            dialog = %id,
            request = %handle.request.path(),
            app_id = %handle.request.app_id(),
            exported = handle.request.is_exported(),
            delivery = ?handle.delivery,
            "Dialog opened"
        );

        self.handles.insert(id, handle);

        if ready.send(id).is_err() {
            debug!(dialog = %id, "Caller stopped waiting for the dialog to open");
        }
    }

    /// The termination routine. Runs at most once per dialog.
    async fn terminate(&mut self, termination: Termination) {
        let id = termination.id();
        let Some(DialogHandle {
            mut request,
            dialog,
            delivery,
        }) = self.handles.remove(&id)
        else {
            debug!(dialog = %id, "Dialog already finished, ignoring termination");
            return;
        };

        match termination {
            Termination::Outcome { code, results, .. } => {
                info!(dialog = %id, request = %request.path(), %code, "Dialog answered");
                match delivery {
                    Delivery::Signal => {
                        if request.is_exported() {
                            request.emit_response(code, results).await;
                            request.unexport().await;
                        } else {
                            debug!(
                                request = %request.path(),
                                "Request is not exported, skipping Response"
                            );
                        }
                    }
                    Delivery::Reply(reply) => {
                        if request.is_exported() {
                            request.unexport().await;
                        }
                        if reply.send((code, results)).is_err() {
                            warn!(request = %request.path(), "Caller no longer waiting for the answer");
                        }
                    }
                }
            }
            Termination::CloseRequested { .. } => {
                info!(dialog = %id, request = %request.path(), "Dialog closed by caller");
                if request.is_exported() {
                    request.unexport().await;
                }
                if let Delivery::Reply(reply) = delivery {
                    if reply.send((ResponseCode::Other, Results::new())).is_err() {
                        warn!(request = %request.path(), "Caller no longer waiting for the answer");
                    }
                }
            }
        }

        dialog.close();
    }
}
