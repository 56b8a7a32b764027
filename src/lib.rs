//! Missing-trailer scanner and downloader for Plex media libraries
//!
//! Walks configured movie and TV library sections, determines which items
//! lack a trailer (via server extras or a local filesystem probe), and
//! acquires one from a video search source into a `Trailers` directory
//! beside the media, optionally refreshing server metadata afterwards.

pub mod cli;
pub mod config;
pub mod jobs;
pub mod services;
