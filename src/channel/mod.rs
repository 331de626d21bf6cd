//! Video channel tracking: identifier resolution and the persisted channel list.
//!
//! - [`resolver`] - Recover a channel id from a human-facing channel URL
//! - [`store`] - JSON-backed list of tracked channels
//!
//! Channel feeds themselves go through the regular [`crate::feed`] pipeline
//! with [`crate::feed::FeedProfile::video_channel`].

pub mod resolver;
mod scrape;
pub mod store;

pub use resolver::{
    channel_name_from_url, extract_channel_id, plan_resolution, resolve_channel_id,
    ResolutionPlan, ResolveError, Strategy, UNKNOWN_CHANNEL,
};
pub use store::{ChannelList, StoreError};
