//! Controller driver loop: owns the navigation and element-discovery polls.
//!
//! In-page navigation and late-rendering players have no native hooks in the
//! host document model, so both are observed by polling. The navigation poll
//! runs for the controller's whole life; the element-discovery poll cancels
//! itself once its target is bound or its attempt budget runs out, so pages
//! that never produce the target do not poll forever. Both stop when the
//! controller's cancellation token fires.

use super::{PageEvent, TabCommand, TabController, TabReply};
use crate::audio::AudioGraph;
use crate::error::{Result, VolumaError};
use std::time::Duration;
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

/// Command channel capacity per controller.
const COMMAND_CAPACITY: usize = 32;

struct ControllerRequest {
    command: TabCommand,
    reply_tx: oneshot::Sender<TabReply>,
}

/// Handle to a spawned controller task.
#[derive(Clone)]
pub struct ControllerHandle {
    request_tx: mpsc::Sender<ControllerRequest>,
    event_tx: mpsc::UnboundedSender<PageEvent>,
    cancel: CancellationToken,
}

impl ControllerHandle {
    /// Send a command and await its reply.
    pub async fn command(&self, command: TabCommand) -> Result<TabReply> {
        let (reply_tx, reply_rx) = oneshot::channel();
        self.request_tx
            .send(ControllerRequest { command, reply_tx })
            .await
            .map_err(|_| VolumaError::Channel("controller is gone".into()))?;
        reply_rx
            .await
            .map_err(|_| VolumaError::Channel("controller dropped the reply".into()))
    }

    /// Deliver a page event (fire-and-forget).
    pub fn page_event(&self, event: PageEvent) {
        let _ = self.event_tx.send(event);
    }

    /// Tear the controller down.
    pub fn shutdown(&self) {
        self.cancel.cancel();
    }
}

/// Spawn a controller onto the current tokio runtime.
pub fn spawn<G: AudioGraph + 'static>(controller: TabController<G>) -> ControllerHandle {
    let (request_tx, request_rx) = mpsc::channel(COMMAND_CAPACITY);
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let cancel = controller.cancel_token();

    tokio::spawn(run(controller, request_rx, event_rx));

    ControllerHandle {
        request_tx,
        event_tx,
        cancel,
    }
}

/// Reactor loop for one controller.
///
/// Serializes every state mutation on this single task: commands, page
/// events, and both poll ticks interleave but never overlap.
async fn run<G: AudioGraph>(
    mut controller: TabController<G>,
    mut requests: mpsc::Receiver<ControllerRequest>,
    mut events: mpsc::UnboundedReceiver<PageEvent>,
) {
    let cancel = controller.cancel_token();
    let watch = controller.watch_config().clone();

    // Page ready counts as the first opportunity to build the graph.
    controller.init_audio();

    let mut navigation = tokio::time::interval(Duration::from_millis(watch.navigation_poll_ms));
    navigation.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);
    let mut element_poll = tokio::time::interval(Duration::from_millis(watch.element_poll_ms));
    element_poll.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Skip);

    let mut poll_attempts: u32 = 0;
    let mut poll_active = true;

    loop {
        tokio::select! {
            _ = cancel.cancelled() => {
                info!("controller cancelled");
                break;
            }
            request = requests.recv() => match request {
                Some(ControllerRequest { command, reply_tx }) => {
                    let reply = controller.handle_command(command).await;
                    let _ = reply_tx.send(reply);
                }
                None => break,
            },
            event = events.recv() => match event {
                Some(event) => controller.handle_page_event(event),
                None => break,
            },
            _ = navigation.tick() => controller.check_navigation().await,
            _ = element_poll.tick(), if poll_active => {
                poll_attempts += 1;
                if controller.poll_player() {
                    debug!("dedicated player bound; element discovery poll stopped");
                    poll_active = false;
                } else if poll_attempts >= watch.element_poll_max_attempts {
                    debug!(
                        attempts = poll_attempts,
                        "element discovery budget exhausted; poll stopped"
                    );
                    poll_active = false;
                }
            }
        }
    }
}
