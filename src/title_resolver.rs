//! Best-effort title resolution for external video ids.
//!
//! One lookup per request against an oEmbed-style endpoint; failures fall
//! back to a positional placeholder and are never retried or surfaced.
//! Results carry the request generation so the playlist manager can discard
//! lookups that resolved after the track was removed or replaced.

use std::time::Duration;

use log::{debug, error};
use serde_json::Value;
use tokio::sync::broadcast::{Receiver, Sender};

use crate::config::LookupConfig;
use crate::protocol::{Message, MetadataMessage};
use crate::video_id::VideoId;

pub struct TitleResolver {
    bus_consumer: Receiver<Message>,
    bus_producer: Sender<Message>,
    http_client: ureq::Agent,
    endpoint: String,
    title_limit: usize,
}

impl TitleResolver {
    pub fn new(
        bus_consumer: Receiver<Message>,
        bus_producer: Sender<Message>,
        lookup: &LookupConfig,
    ) -> Self {
        let http_client = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(lookup.connect_timeout_s))
            .timeout_read(Duration::from_secs(lookup.read_timeout_s))
            .timeout_write(Duration::from_secs(lookup.read_timeout_s))
            .build();
        Self {
            bus_consumer,
            bus_producer,
            http_client,
            endpoint: lookup.endpoint.clone(),
            title_limit: lookup.title_limit,
        }
    }

    /// Starts the blocking lookup loop.
    pub fn run(&mut self) {
        loop {
            match self.bus_consumer.blocking_recv() {
                Ok(Message::Metadata(MetadataMessage::ResolveTitle {
                    id,
                    position,
                    generation,
                })) => {
                    let title = match self.lookup_title(&id) {
                        Ok(title) => title,
                        Err(err) => {
                            debug!("TitleResolver: lookup failed for {}: {}", id, err);
                            placeholder_title(position)
                        }
                    };
                    let _ = self.bus_producer.send(Message::Metadata(
                        MetadataMessage::TitleResolved {
                            id,
                            title,
                            generation,
                        },
                    ));
                }
                Ok(_) => {}
                Err(tokio::sync::broadcast::error::RecvError::Lagged(skipped)) => {
                    log::warn!(
                        "TitleResolver lagged on control bus, skipped {} message(s)",
                        skipped
                    );
                }
                Err(tokio::sync::broadcast::error::RecvError::Closed) => {
                    error!("TitleResolver: bus closed");
                    break;
                }
            }
        }
    }

    fn lookup_title(&self, id: &VideoId) -> Result<String, String> {
        let watch_url = format!("https://www.youtube.com/watch?v={}", id);
        let url = format!("{}?url={}", self.endpoint, urlencoding::encode(&watch_url));

        let response = self
            .http_client
            .get(&url)
            .call()
            .map_err(|err| format!("title lookup request failed: {err}"))?;
        let parsed: Value = response
            .into_json()
            .map_err(|err| format!("title lookup response parse failed: {err}"))?;

        let title = parsed
            .get("title")
            .and_then(Value::as_str)
            .ok_or_else(|| "title lookup response missing title".to_string())?;
        Ok(clip_title(title, self.title_limit))
    }
}

/// Truncates a looked-up title to `limit` characters, marking the cut with
/// an ellipsis.
pub fn clip_title(title: &str, limit: usize) -> String {
    if title.chars().count() > limit {
        let clipped: String = title.chars().take(limit).collect();
        format!("{}...", clipped)
    } else {
        title.to_string()
    }
}

/// Display name used when no title could be resolved for the track at
/// `position`.
pub fn placeholder_title(position: usize) -> String {
    format!("Track {}", position + 1)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::{Duration, Instant};
    use tokio::sync::broadcast::{self, error::TryRecvError};

    use crate::config::LookupConfig;

    #[test]
    fn short_titles_pass_through() {
        assert_eq!(clip_title("Song Name", 30), "Song Name");
    }

    #[test]
    fn boundary_length_title_is_not_clipped() {
        let title = "a".repeat(30);
        assert_eq!(clip_title(&title, 30), title);
    }

    #[test]
    fn long_titles_are_clipped_with_ellipsis() {
        let title = "a".repeat(31);
        let clipped = clip_title(&title, 30);
        assert_eq!(clipped.len(), 33);
        assert!(clipped.ends_with("..."));
    }

    #[test]
    fn clipping_respects_character_boundaries() {
        let title = "é".repeat(40);
        let clipped = clip_title(&title, 30);
        assert_eq!(clipped.chars().count(), 33);
    }

    #[test]
    fn placeholder_is_one_based() {
        assert_eq!(placeholder_title(0), "Track 1");
        assert_eq!(placeholder_title(4), "Track 5");
    }

    #[test]
    fn failed_lookup_resolves_to_placeholder() {
        let (bus_sender, _) = broadcast::channel(64);
        let resolver_receiver = bus_sender.subscribe();
        let resolver_sender = bus_sender.clone();
        let mut receiver = bus_sender.subscribe();

        // Unroutable endpoint: the request fails fast with a refused
        // connection and the resolver must fall back to the placeholder.
        let lookup = LookupConfig {
            endpoint: "http://127.0.0.1:9/embed".to_string(),
            connect_timeout_s: 1,
            read_timeout_s: 1,
            title_limit: 30,
        };
        thread::spawn(move || {
            let mut resolver = TitleResolver::new(resolver_receiver, resolver_sender, &lookup);
            resolver.run();
        });

        bus_sender
            .send(Message::Metadata(MetadataMessage::ResolveTitle {
                id: VideoId::new("dQw4w9WgXcQ"),
                position: 2,
                generation: 7,
            }))
            .unwrap();

        let start = Instant::now();
        loop {
            if start.elapsed() > Duration::from_secs(5) {
                panic!("timed out waiting for TitleResolved");
            }
            match receiver.try_recv() {
                Ok(Message::Metadata(MetadataMessage::TitleResolved {
                    id,
                    title,
                    generation,
                })) => {
                    assert_eq!(id, VideoId::new("dQw4w9WgXcQ"));
                    assert_eq!(title, "Track 3");
                    assert_eq!(generation, 7);
                    return;
                }
                Ok(_) => {}
                Err(TryRecvError::Empty) => thread::sleep(Duration::from_millis(10)),
                Err(TryRecvError::Lagged(_)) => continue,
                Err(TryRecvError::Closed) => panic!("bus closed"),
            }
        }
    }
}
