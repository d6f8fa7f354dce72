//! Minimal actor plumbing: one logical thread of execution per unit, driven
//! by an inbox, communicated with through a cheaply cloneable handle.
//!
//! This replaces a proprietary actor-macro framework the teacher depended
//! on. The shape is the same — a task owns its state exclusively and
//! processes messages off an mpsc channel one at a time — but it's built
//! from `tokio::sync::mpsc` directly rather than generated by a macro.

use std::future::Future;
use std::pin::Pin;
use tokio::sync::{mpsc, oneshot};

/// A boxed, type-erased future borrowing from the actor's state for the
/// duration of one message handle. Needed because a plain generic `Fut`
/// can't express that the future's lifetime is tied to the `&mut S`
/// argument of each call (the `async fn handle_message` passed in at each
/// call site has a different concrete future type per lifetime).
type HandleFuture<'a> = Pin<Box<dyn Future<Output = ()> + Send + 'a>>;

/// A cloneable reference to a running actor's inbox.
///
/// Dropping every `Handle` for an actor closes its channel, which unblocks
/// the actor's receive loop with `None` so it can shut down.
#[derive(Debug)]
pub struct Handle<M> {
    sender: mpsc::UnboundedSender<M>,
}

impl<M> Clone for Handle<M> {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
        }
    }
}

impl<M> Handle<M> {
    /// Sends a fire-and-forget message to the actor. Fails silently (logged
    /// by the caller, if it cares) when the actor has already shut down.
    pub fn tell(&self, message: M) -> Result<(), mpsc::error::SendError<M>> {
        self.sender.send(message)
    }
}

/// Builds an inbox and the `Handle` for it without spawning anything yet.
/// Useful when an actor's own state needs to hold a handle to itself —
/// construct the channel first, build the state with the handle in hand,
/// then spawn its receive loop with `run`.
pub fn channel<M>() -> (Handle<M>, mpsc::UnboundedReceiver<M>) {
    let (sender, receiver) = mpsc::unbounded_channel();
    (Handle { sender }, receiver)
}

/// Spawns the receive loop for an inbox built with `channel`.
pub fn run<S, M, F>(mut state: S, mut receiver: mpsc::UnboundedReceiver<M>, mut handle_message: F)
where
    S: Send + 'static,
    M: Send + 'static,
    F: for<'a> FnMut(&'a mut S, M) -> HandleFuture<'a> + Send + 'static,
{
    tokio::spawn(async move {
        while let Some(message) = receiver.recv().await {
            handle_message(&mut state, message).await;
        }
    });
}

/// Spawns an actor task that owns `state` and processes messages from a
/// fresh inbox one at a time via `handle_message`, returning a `Handle` to
/// that inbox.
///
/// `handle_message` takes `&mut S` so state mutation is exclusive to the
/// actor's own task; no locking is ever needed.
pub fn spawn<S, M, F>(mut state: S, mut handle_message: F) -> Handle<M>
where
    S: Send + 'static,
    M: Send + 'static,
    F: for<'a> FnMut(&'a mut S, M) -> HandleFuture<'a> + Send + 'static,
{
    let (sender, mut receiver) = mpsc::unbounded_channel::<M>();

    tokio::spawn(async move {
        while let Some(message) = receiver.recv().await {
            handle_message(&mut state, message).await;
        }
    });

    Handle { sender }
}

/// Sends `build_request(reply_tx)` to `handle` and awaits the reply,
/// mirroring the request/response ("ask") pattern a generated actor proxy
/// would offer.
pub async fn ask<M, R>(
    handle: &Handle<M>,
    build_request: impl FnOnce(oneshot::Sender<R>) -> M,
) -> Option<R> {
    let (reply_tx, reply_rx) = oneshot::channel();
    handle.tell(build_request(reply_tx)).ok()?;
    reply_rx.await.ok()
}
