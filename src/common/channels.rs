//! Channel type definitions for tracker events

use tokio::sync::broadcast;

use super::types::TrackerEvent;

/// Default channel buffer size
pub const DEFAULT_CHANNEL_SIZE: usize = 1000;

/// Create a new tracker event channel; a zero size is bumped to one
pub fn create_event_channel_with_size(
    size: usize,
) -> (broadcast::Sender<TrackerEvent>, broadcast::Receiver<TrackerEvent>) {
    broadcast::channel(size.max(1))
}
