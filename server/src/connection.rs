//! One websocket client
//!
//! Every connection runs two halves. The inbound half decodes requests and queues them; the
//! outbound half answers them one at a time, in queue order, and keeps the peer alive with pings.
//! Whichever half stops first ends the connection: when the inbound half stops it tells the
//! outbound half why, which then sends a close frame and returns.

use crate::error::ConnectionError;
use crate::settings::ServerSettings;
use chem_index::context::Context;
use chem_index::handlers::dispatch;
use chem_index::message::Request;
use futures::{Sink, SinkExt, Stream, StreamExt};
use hyper_tungstenite::tungstenite::Message;
use log::{debug, error, warn};
use std::fmt;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc::error::TrySendError;
use tokio::sync::{mpsc, oneshot};
use tokio::time::{interval_at, timeout, timeout_at, Instant, MissedTickBehavior};

/// How the inbound half ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Closed {
    PeerClosed,
    EndOfStream,
    ReadError(String),
    /// No pong arrived within the read deadline.
    Timeout,
    Decode(String),
    /// The request queue was full.
    Overflow,
    OutboundGone,
}

impl fmt::Display for Closed {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Closed::PeerClosed => write!(f, "closed by peer"),
            Closed::EndOfStream => write!(f, "stream ended"),
            Closed::ReadError(e) => write!(f, "read failed: {}", e),
            Closed::Timeout => write!(f, "peer timed out"),
            Closed::Decode(e) => write!(f, "undecodable request: {}", e),
            Closed::Overflow => write!(f, "request queue overflow"),
            Closed::OutboundGone => write!(f, "outbound half stopped"),
        }
    }
}

/// Reads requests until the connection ends, queueing each one without waiting for room.
///
/// Only pongs move the read deadline forward.
pub async fn read_loop<S, E>(
    mut inbound: S,
    queue: mpsc::Sender<Request>,
    pong_wait: Duration,
) -> Closed
where
    S: Stream<Item = Result<Message, E>> + Unpin,
    E: fmt::Display,
{
    let mut deadline = Instant::now() + pong_wait;

    loop {
        let next = match timeout_at(deadline, inbound.next()).await {
            Ok(next) => next,
            Err(_) => return Closed::Timeout,
        };

        let message = match next {
            Some(Ok(message)) => message,
            Some(Err(e)) => return Closed::ReadError(e.to_string()),
            None => return Closed::EndOfStream,
        };

        let decoded = match message {
            Message::Text(text) => serde_json::from_str::<Request>(&text),
            Message::Binary(data) => serde_json::from_slice::<Request>(&data),
            Message::Pong(_) => {
                deadline = Instant::now() + pong_wait;
                continue;
            }
            Message::Close(_) => return Closed::PeerClosed,
            Message::Ping(_) | Message::Frame(_) => continue,
        };

        let request = match decoded {
            Ok(request) => request,
            Err(e) => return Closed::Decode(e.to_string()),
        };

        debug!("Queueing {} {:?}", request.command, request.args);

        match queue.try_send(request) {
            Ok(()) => {}
            Err(TrySendError::Full(_)) => return Closed::Overflow,
            Err(TrySendError::Closed(_)) => return Closed::OutboundGone,
        }
    }
}

/// Answers queued requests in order until told to stop or the queue closes, then sends a close
/// frame.
///
/// A ping goes out whenever nothing has been written for `ping_period`. Every write has to finish
/// within `write_wait`.
pub async fn write_loop<S>(
    mut outbound: S,
    context: Arc<Context>,
    mut requests: mpsc::Receiver<Request>,
    mut stop: oneshot::Receiver<Closed>,
    write_wait: Duration,
    ping_period: Duration,
) -> Result<(), ConnectionError>
where
    S: Sink<Message> + Unpin,
    S::Error: fmt::Display,
{
    let mut ticker = interval_at(Instant::now() + ping_period, ping_period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;

            reason = &mut stop => {
                if let Ok(reason) = reason {
                    debug!("Stopping connection: {}", reason);
                }
                return close(&mut outbound, write_wait).await;
            }

            request = requests.recv() => {
                let request = match request {
                    Some(request) => request,
                    None => return close(&mut outbound, write_wait).await,
                };

                if let Some(text) = respond(context.clone(), request).await {
                    send(&mut outbound, Message::Text(text), write_wait).await?;
                    ticker.reset();
                }
            }

            _ = ticker.tick() => {
                send(&mut outbound, Message::Ping(Vec::new()), write_wait).await?;
            }
        }
    }
}

/// Runs both halves of one connection until it ends.
pub async fn serve_connection<S, E>(socket: S, context: Arc<Context>, settings: Arc<ServerSettings>)
where
    S: Stream<Item = Result<Message, E>> + Sink<Message> + Unpin + Send + 'static,
    <S as Sink<Message>>::Error: fmt::Display + Send,
    E: fmt::Display,
{
    let (sink, stream) = socket.split();
    let (queue, requests) = mpsc::channel(settings.queue_capacity);
    let (stop_tx, stop_rx) = oneshot::channel();

    let mut outbound = tokio::spawn(write_loop(
        sink,
        context,
        requests,
        stop_rx,
        settings.write_wait(),
        settings.ping_period(),
    ));

    enum First {
        Inbound(Closed),
        Outbound(Result<Result<(), ConnectionError>, tokio::task::JoinError>),
    }

    let first = tokio::select! {
        closed = read_loop(stream, queue, settings.pong_wait()) => First::Inbound(closed),
        finished = &mut outbound => First::Outbound(finished),
    };

    let finished = match first {
        First::Inbound(closed) => {
            match &closed {
                Closed::Overflow | Closed::Decode(_) | Closed::ReadError(_) | Closed::Timeout => {
                    warn!("Connection closing: {}", closed)
                }
                _ => debug!("Connection closing: {}", closed),
            }
            // the outbound half may already be gone
            let _ = stop_tx.send(closed);
            outbound.await
        }
        First::Outbound(finished) => finished,
    };

    match finished {
        Ok(Ok(())) => debug!("Connection closed"),
        Ok(Err(e)) => warn!("Connection failed: {}", e),
        Err(e) => error!("Connection task failed: {}", e),
    }
}

/// Dispatches on the blocking pool since handlers read files synchronously.
async fn respond(context: Arc<Context>, request: Request) -> Option<String> {
    let command = request.command.clone();

    let answered = tokio::task::spawn_blocking(move || {
        dispatch(&context, &request).map(|response| response.to_json())
    })
    .await;

    match answered {
        Ok(Some(Ok(text))) => Some(text),
        Ok(Some(Err(e))) => {
            error!("Could not serialize response to {}: {}", command, e);
            None
        }
        Ok(None) => None,
        Err(e) => {
            error!("Handler for {} failed: {}", command, e);
            None
        }
    }
}

async fn send<S>(outbound: &mut S, message: Message, write_wait: Duration) -> Result<(), ConnectionError>
where
    S: Sink<Message> + Unpin,
    S::Error: fmt::Display,
{
    match timeout(write_wait, outbound.send(message)).await {
        Ok(Ok(())) => Ok(()),
        Ok(Err(e)) => Err(ConnectionError::Write(e.to_string())),
        Err(_) => Err(ConnectionError::WriteTimeout(write_wait)),
    }
}

async fn close<S>(outbound: &mut S, write_wait: Duration) -> Result<(), ConnectionError>
where
    S: Sink<Message> + Unpin,
    S::Error: fmt::Display,
{
    // the peer may be gone already, nothing left to report
    if let Err(e) = send(outbound, Message::Close(None), write_wait).await {
        debug!("Close frame not sent: {}", e);
    }
    Ok(())
}
