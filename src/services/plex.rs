//! Plex Media Server API client
//!
//! Thin client over the server's JSON API, limited to the narrow surface
//! this tool needs: section lookup, item listing, per-item metadata,
//! extras, label edits, and metadata refresh. Authentication is the
//! `X-Plex-Token` header; responses are requested as JSON.

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use serde::Deserialize;
use tracing::{debug, info};

use super::rate_limiter::{RateLimitedClient, RetryConfig, retry_async};

/// Plex item type discriminators used by section-level edits.
pub const PLEX_TYPE_MOVIE: &str = "1";
pub const PLEX_TYPE_SHOW: &str = "2";

/// A library section as reported by the server.
#[derive(Debug, Clone, Deserialize)]
pub struct PlexSection {
    pub key: String,
    pub title: String,
    #[serde(rename = "type")]
    pub section_type: String,
}

/// One media item, reduced to the fields acquisition needs.
///
/// For movies the locations are media file paths; for shows they are the
/// show directories. Read-only except for label mutation via the client.
#[derive(Debug, Clone, Default)]
pub struct MediaItem {
    pub rating_key: String,
    pub title: String,
    pub year: Option<i32>,
    pub genres: Vec<String>,
    pub labels: Vec<String>,
    pub locations: Vec<PathBuf>,
}

/// Classification of one server-side extra clip.
#[derive(Debug, Clone, Deserialize)]
pub struct PlexExtra {
    #[serde(rename = "type")]
    pub extra_type: Option<String>,
    pub subtype: Option<String>,
    pub title: Option<String>,
}

impl PlexExtra {
    /// Whether this extra is a trailer clip.
    pub fn is_trailer(&self) -> bool {
        self.extra_type.as_deref() == Some("clip") && self.subtype.as_deref() == Some("trailer")
    }
}

// Wire envelopes. Plex wraps every payload in a MediaContainer.

#[derive(Deserialize)]
struct SectionsEnvelope {
    #[serde(rename = "MediaContainer")]
    container: SectionsContainer,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct SectionsContainer {
    #[serde(rename = "Directory")]
    directories: Vec<PlexSection>,
}

#[derive(Deserialize)]
struct ItemsEnvelope {
    #[serde(rename = "MediaContainer")]
    container: ItemsContainer,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ItemsContainer {
    #[serde(rename = "Metadata")]
    metadata: Vec<RawMetadata>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct RawMetadata {
    #[serde(rename = "ratingKey")]
    rating_key: String,
    title: String,
    year: Option<i32>,
    #[serde(rename = "Genre")]
    genres: Vec<TagValue>,
    #[serde(rename = "Label")]
    labels: Vec<TagValue>,
    #[serde(rename = "Location")]
    locations: Vec<LocationValue>,
    #[serde(rename = "Media")]
    media: Vec<MediaValue>,
}

impl RawMetadata {
    fn into_item(self) -> MediaItem {
        // Shows report Location directories; movies only carry file paths
        // inside Media/Part.
        let locations: Vec<PathBuf> = if self.locations.is_empty() {
            self.media
                .into_iter()
                .flat_map(|m| m.parts)
                .map(|p| PathBuf::from(p.file))
                .collect()
        } else {
            self.locations
                .into_iter()
                .map(|l| PathBuf::from(l.path))
                .collect()
        };

        MediaItem {
            rating_key: self.rating_key,
            title: self.title,
            year: self.year,
            genres: self.genres.into_iter().map(|t| t.tag).collect(),
            labels: self.labels.into_iter().map(|t| t.tag).collect(),
            locations,
        }
    }
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct TagValue {
    tag: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct LocationValue {
    path: String,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct MediaValue {
    #[serde(rename = "Part")]
    parts: Vec<PartValue>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct PartValue {
    file: String,
}

#[derive(Deserialize)]
struct ExtrasEnvelope {
    #[serde(rename = "MediaContainer")]
    container: ExtrasContainer,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct ExtrasContainer {
    #[serde(rename = "Metadata")]
    metadata: Vec<PlexExtra>,
}

#[derive(Deserialize)]
struct IdentityEnvelope {
    #[serde(rename = "MediaContainer")]
    container: IdentityContainer,
}

#[derive(Deserialize, Default)]
#[serde(default)]
struct IdentityContainer {
    version: Option<String>,
    #[serde(rename = "machineIdentifier")]
    machine_identifier: Option<String>,
}

/// Plex API client with rate limiting and retry logic
pub struct PlexClient {
    client: Arc<RateLimitedClient>,
    base_url: String,
    token: String,
    retry_config: RetryConfig,
}

impl PlexClient {
    /// Create a new client for the given server URL and token.
    pub fn new(base_url: &str, token: &str) -> Self {
        Self {
            client: Arc::new(RateLimitedClient::for_plex()),
            base_url: base_url.trim_end_matches('/').to_string(),
            token: token.to_string(),
            retry_config: RetryConfig::default(),
        }
    }

    /// Verify connectivity and auth. Returns the server version.
    pub async fn check_connection(&self) -> Result<String> {
        let identity: IdentityEnvelope = self.get_json("/identity", &[], "plex_identity").await?;
        let version = identity
            .container
            .version
            .or(identity.container.machine_identifier)
            .unwrap_or_else(|| "unknown".to_string());
        info!(server = %self.base_url, version = %version, "Connected to Plex");
        Ok(version)
    }

    /// Look up a library section by exact title.
    pub async fn find_section(&self, name: &str) -> Result<Option<PlexSection>> {
        let sections: SectionsEnvelope = self
            .get_json("/library/sections", &[], "plex_sections")
            .await?;
        Ok(sections
            .container
            .directories
            .into_iter()
            .find(|s| s.title == name))
    }

    /// List items in a section. With `exclude_label`, the server filters
    /// out items already carrying the label (incremental mode).
    pub async fn section_items(
        &self,
        section_key: &str,
        exclude_label: Option<&str>,
    ) -> Result<Vec<MediaItem>> {
        let path = format!("/library/sections/{}/all", section_key);
        let mut query: Vec<(&str, String)> = Vec::new();
        if let Some(label) = exclude_label {
            query.push(("label!", label.to_string()));
        }
        let items: ItemsEnvelope = self.get_json(&path, &query, "plex_section_items").await?;
        Ok(items
            .container
            .metadata
            .into_iter()
            .map(RawMetadata::into_item)
            .collect())
    }

    /// Fetch full metadata for one item (genres, labels, locations).
    ///
    /// Section listings omit file locations for shows, so the walker
    /// re-fetches each item before inspecting it.
    pub async fn item(&self, rating_key: &str) -> Result<MediaItem> {
        let path = format!("/library/metadata/{}", rating_key);
        let items: ItemsEnvelope = self.get_json(&path, &[], "plex_item").await?;
        items
            .container
            .metadata
            .into_iter()
            .next()
            .map(RawMetadata::into_item)
            .with_context(|| format!("Plex returned no metadata for item {}", rating_key))
    }

    /// Fetch the extras attached to an item.
    pub async fn extras(&self, rating_key: &str) -> Result<Vec<PlexExtra>> {
        let path = format!("/library/metadata/{}/extras", rating_key);
        let extras: ExtrasEnvelope = self.get_json(&path, &[], "plex_extras").await?;
        Ok(extras.container.metadata)
    }

    /// Ask the server to refresh metadata for one item.
    pub async fn refresh_metadata(&self, rating_key: &str) -> Result<()> {
        let path = format!("/library/metadata/{}/refresh", rating_key);
        self.put(&path, &[], "refresh").await
    }

    /// Tag an item with a label via a section-level edit.
    ///
    /// Unlocks the label field in the same request, matching how the Plex
    /// web UI applies label edits.
    pub async fn add_label(
        &self,
        section_key: &str,
        type_id: &str,
        rating_key: &str,
        label: &str,
    ) -> Result<()> {
        let path = format!("/library/sections/{}/all", section_key);
        let query: Vec<(&str, String)> = vec![
            ("type", type_id.to_string()),
            ("id", rating_key.to_string()),
            ("label.locked", "0".to_string()),
            ("label[0].tag.tag", label.to_string()),
        ];
        self.put(&path, &query, "add_label").await
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
        operation: &str,
    ) -> Result<T> {
        let url = format!("{}{}", self.base_url, path);
        let client = self.client.clone();
        let token = self.token.clone();

        retry_async(
            || {
                let url = url.clone();
                let client = client.clone();
                let token = token.clone();
                async move {
                    let response = client
                        .get_with_headers_and_query(
                            &url,
                            &[
                                ("X-Plex-Token", token.as_str()),
                                ("Accept", "application/json"),
                            ],
                            query,
                        )
                        .await?;

                    if response.status().as_u16() == 401 {
                        anyhow::bail!("Plex token rejected (401)");
                    }
                    if response.status().as_u16() == 404 {
                        anyhow::bail!("Plex resource not found: {}", url);
                    }
                    if !response.status().is_success() {
                        anyhow::bail!("Plex request failed with status {}", response.status());
                    }

                    let parsed: T = response
                        .json()
                        .await
                        .context("Failed to parse Plex response")?;
                    debug!(url = %url, "Plex request ok");
                    Ok(parsed)
                }
            },
            &self.retry_config,
            operation,
        )
        .await
    }

    async fn put(&self, path: &str, query: &[(&str, String)], operation: &str) -> Result<()> {
        let url = format!("{}{}", self.base_url, path);
        let response = self
            .client
            .put_with_headers_and_query(
                &url,
                &[
                    ("X-Plex-Token", self.token.as_str()),
                    ("Accept", "application/json"),
                ],
                query,
            )
            .await?;
        if !response.status().is_success() {
            anyhow::bail!(
                "Plex {} failed with status {}",
                operation,
                response.status()
            );
        }
        Ok(())
    }
}

impl std::fmt::Debug for PlexClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PlexClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_movie_item_locations_from_media_parts() {
        let json = r#"{
            "MediaContainer": {
                "Metadata": [{
                    "ratingKey": "101",
                    "title": "Avatar",
                    "year": 2009,
                    "Genre": [{"tag": "Science Fiction"}],
                    "Media": [{"Part": [{"file": "/data/Movies/Avatar (2009)/Avatar (2009).mkv"}]}]
                }]
            }
        }"#;
        let envelope: ItemsEnvelope = serde_json::from_str(json).unwrap();
        let item = envelope
            .container
            .metadata
            .into_iter()
            .next()
            .unwrap()
            .into_item();
        assert_eq!(item.rating_key, "101");
        assert_eq!(item.year, Some(2009));
        assert_eq!(item.genres, vec!["Science Fiction"]);
        assert_eq!(
            item.locations,
            vec![PathBuf::from("/data/Movies/Avatar (2009)/Avatar (2009).mkv")]
        );
    }

    #[test]
    fn test_show_item_locations_from_location() {
        let json = r#"{
            "MediaContainer": {
                "Metadata": [{
                    "ratingKey": "202",
                    "title": "Severance",
                    "year": 2022,
                    "Label": [{"tag": "trailarian"}],
                    "Location": [{"path": "/data/TV/Severance"}]
                }]
            }
        }"#;
        let envelope: ItemsEnvelope = serde_json::from_str(json).unwrap();
        let item = envelope
            .container
            .metadata
            .into_iter()
            .next()
            .unwrap()
            .into_item();
        assert_eq!(item.labels, vec!["trailarian"]);
        assert_eq!(item.locations, vec![PathBuf::from("/data/TV/Severance")]);
    }

    #[test]
    fn test_extra_trailer_classification() {
        let trailer = PlexExtra {
            extra_type: Some("clip".to_string()),
            subtype: Some("trailer".to_string()),
            title: None,
        };
        let featurette = PlexExtra {
            extra_type: Some("clip".to_string()),
            subtype: Some("behindTheScenes".to_string()),
            title: None,
        };
        assert!(trailer.is_trailer());
        assert!(!featurette.is_trailer());
    }

    #[test]
    fn test_sections_envelope_parses() {
        let json = r#"{
            "MediaContainer": {
                "Directory": [
                    {"key": "1", "title": "Movies", "type": "movie"},
                    {"key": "2", "title": "TV Shows", "type": "show"}
                ]
            }
        }"#;
        let envelope: SectionsEnvelope = serde_json::from_str(json).unwrap();
        assert_eq!(envelope.container.directories.len(), 2);
        assert_eq!(envelope.container.directories[0].title, "Movies");
    }
}
