//! Protobuf parser for GTFS Realtime feeds.

use prost::Message;

use crate::Result;
use crate::gtfs_rt::FeedMessage;

/// Decodes a protobuf-encoded GTFS-RT [`FeedMessage`] from raw bytes.
///
/// # Errors
///
/// Returns a parse error if the bytes are not valid protobuf for a `FeedMessage`.
pub fn parse_feed(bytes: &[u8]) -> Result<FeedMessage> {
    Ok(FeedMessage::decode(bytes)?)
}

/// Number of entities carrying a vehicle position.
pub fn count_vehicles(feed: &FeedMessage) -> usize {
    feed.entity.iter().filter(|e| e.vehicle.is_some()).count()
}
