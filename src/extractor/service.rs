//! Request queue in front of a [`FrameExtractor`].
//!
//! Requests run one at a time in arrival order. Seeks that pile up behind a
//! running request are coalesced: only the newest one runs and the others
//! are answered with [`ExtractorError::Superseded`].

use super::controller::{DeliveredFrame, FrameExtractor};
use crate::errors::{ExtractorError, ExtractorResult};
use log::debug;
use std::collections::VecDeque;
use tokio::sync::{mpsc, oneshot};

type FrameReply = oneshot::Sender<ExtractorResult<Option<DeliveredFrame>>>;

#[derive(Debug)]
enum Request {
    Next(FrameReply),
    Seek(Option<f64>, FrameReply),
    SeekFrame(usize, FrameReply),
    StepBack(FrameReply),
    Close(oneshot::Sender<()>),
}

impl Request {
    fn is_seek(&self) -> bool {
        matches!(
            self,
            Request::Seek(..) | Request::SeekFrame(..) | Request::StepBack(..)
        )
    }

    fn supersede(self) {
        match self {
            Request::Seek(_, reply) | Request::SeekFrame(_, reply) | Request::StepBack(reply) => {
                let _ = reply.send(Err(ExtractorError::Superseded));
            }
            other => debug!("not a seek, cannot supersede {:?}", other),
        }
    }
}

/// Cheap clonable front end to an [`ExtractorWorker`].
#[derive(Clone)]
pub struct ExtractorHandle {
    tx: mpsc::UnboundedSender<Request>,
}

/// Owns the extractor and serves requests from every handle.
pub struct ExtractorWorker {
    extractor: FrameExtractor,
    rx: mpsc::UnboundedReceiver<Request>,
    backlog: VecDeque<Request>,
}

/// Wrap an initialized extractor in a handle/worker pair.
///
/// The worker must be driven (`run().await`) on the thread that owns the
/// extractor, for example inside a `tokio::task::LocalSet`.
pub fn spawn_service(extractor: FrameExtractor) -> (ExtractorHandle, ExtractorWorker) {
    let (tx, rx) = mpsc::unbounded_channel();
    (
        ExtractorHandle { tx },
        ExtractorWorker {
            extractor,
            rx,
            backlog: VecDeque::new(),
        },
    )
}

impl ExtractorHandle {
    pub async fn next(&self) -> ExtractorResult<Option<DeliveredFrame>> {
        self.call(Request::Next).await
    }

    pub async fn seek(&self, target: Option<f64>) -> ExtractorResult<Option<DeliveredFrame>> {
        self.call(|reply| Request::Seek(target, reply)).await
    }

    pub async fn seek_frame(&self, n: usize) -> ExtractorResult<Option<DeliveredFrame>> {
        self.call(|reply| Request::SeekFrame(n, reply)).await
    }

    pub async fn step_back(&self) -> ExtractorResult<Option<DeliveredFrame>> {
        self.call(Request::StepBack).await
    }

    /// Ask the worker to close the extractor and stop. Returns once it has.
    pub async fn close(&self) {
        let (reply, done) = oneshot::channel();
        if self.tx.send(Request::Close(reply)).is_ok() {
            let _ = done.await;
        }
    }

    async fn call(
        &self,
        make: impl FnOnce(FrameReply) -> Request,
    ) -> ExtractorResult<Option<DeliveredFrame>> {
        let (reply, response) = oneshot::channel();
        self.tx
            .send(make(reply))
            .map_err(|_| ExtractorError::SessionEnded)?;
        response.await.map_err(|_| ExtractorError::SessionEnded)?
    }
}

impl ExtractorWorker {
    pub fn extractor(&self) -> &FrameExtractor {
        &self.extractor
    }

    /// Serve requests until a close request arrives or every handle is
    /// dropped. The extractor is closed on the way out.
    pub async fn run(mut self) -> FrameExtractor {
        while let Some(request) = self.next_request().await {
            match request {
                Request::Next(reply) => {
                    let result = self.extractor.next().await;
                    let _ = reply.send(result);
                }
                Request::Seek(target, reply) => {
                    let result = self.extractor.seek(target).await;
                    let _ = reply.send(result);
                }
                Request::SeekFrame(n, reply) => {
                    let result = self.extractor.seek_frame(n).await;
                    let _ = reply.send(result);
                }
                Request::StepBack(reply) => {
                    let result = self.extractor.step_back().await;
                    let _ = reply.send(result);
                }
                Request::Close(reply) => {
                    self.extractor.close();
                    let _ = reply.send(());
                    break;
                }
            }
        }
        self.extractor.close();
        self.fail_remaining();
        self.extractor
    }

    /// Next request to run, with queued seeks collapsed onto the newest one.
    async fn next_request(&mut self) -> Option<Request> {
        let first = match self.backlog.pop_front() {
            Some(request) => request,
            None => self.rx.recv().await?,
        };
        while let Ok(request) = self.rx.try_recv() {
            self.backlog.push_back(request);
        }
        if !first.is_seek() {
            return Some(first);
        }

        // Collapse the run of seeks at the head of the queue.
        let mut current = first;
        while self.backlog.front().is_some_and(Request::is_seek) {
            if let Some(newer) = self.backlog.pop_front() {
                debug!("seek superseded by a newer request");
                std::mem::replace(&mut current, newer).supersede();
            }
        }
        Some(current)
    }

    fn fail_remaining(&mut self) {
        self.rx.close();
        while let Ok(request) = self.rx.try_recv() {
            self.backlog.push_back(request);
        }
        for request in self.backlog.drain(..) {
            match request {
                Request::Next(reply)
                | Request::Seek(_, reply)
                | Request::SeekFrame(_, reply)
                | Request::StepBack(reply) => {
                    let _ = reply.send(Err(ExtractorError::SessionEnded));
                }
                Request::Close(reply) => {
                    let _ = reply.send(());
                }
            }
        }
    }
}
