//! Wiring: one consumer task per configured topic, dispatching delivered
//! messages through the `GroupDispatcher` for that topic's configured
//! groups, in declared order.
//!
//! Grounded in `original_source/lib/api.go`'s per-topic handler
//! registration, one `tokio::spawn`ed task per concern.

use crate::bus::EventBus;
use crate::error::ViewError;
use crate::group::{EventActionGroup, GroupDispatcher};
use crate::store::DocumentStore;
use std::collections::HashMap;
use std::sync::Arc;

/// Run the consumer loop for every configured topic, returning when all
/// topic tasks have been spawned. Each task runs until its subscription
/// channel closes.
pub async fn run<S, B>(
    bus: Arc<B>,
    dispatcher: Arc<GroupDispatcher<S>>,
    consumer_group: &str,
    events: HashMap<String, Vec<EventActionGroup>>,
) -> Vec<tokio::task::JoinHandle<()>>
where
    S: DocumentStore + 'static,
    B: EventBus + 'static,
{
    let mut handles = Vec::with_capacity(events.len());
    for (topic, groups) in events {
        let bus = bus.clone();
        let dispatcher = dispatcher.clone();
        let consumer_group = consumer_group.to_string();
        let handle = tokio::spawn(async move {
            let mut rx = match bus.subscribe(&topic, &consumer_group).await {
                Ok(rx) => rx,
                Err(e) => {
                    tracing::error!(topic = %topic, error = %e, "failed to subscribe to topic");
                    return;
                }
            };

            while let Some(message) = rx.recv().await {
                for group in &groups {
                    if let Err(e) = dispatcher.dispatch(group, &message.payload).await {
                        if matches!(e, ViewError::VersionConflict { .. }) {
                            tracing::warn!(topic = %topic, target = %group.target, error = %e, "version conflict, redelivering");
                            if let Err(nack_err) = bus.nack(message.clone()).await {
                                tracing::error!(topic = %topic, error = %nack_err, "failed to redeliver message");
                            }
                            break;
                        }
                        tracing::error!(topic = %topic, target = %group.target, error = %e, "group dispatch failed");
                    }
                }
            }
        });
        handles.push(handle);
    }
    handles
}
