use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ItemKind {
    AudioFile,
    Link,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CatalogItem {
    pub url: String,
    pub kind: ItemKind,
    pub posted_at: DateTime<Utc>,
    pub author_name: String,
}

/// Everything deliverable found in one scan of the source channel.
#[derive(Debug, Default)]
pub struct Catalog {
    items: Vec<CatalogItem>,
    by_url: HashMap<String, usize>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds an item. A url seen twice keeps its earliest posting.
    pub fn insert(&mut self, item: CatalogItem) {
        match self.by_url.get(&item.url) {
            Some(&idx) => {
                if item.posted_at < self.items[idx].posted_at {
                    self.items[idx] = item;
                }
            }
            None => {
                self.by_url.insert(item.url.clone(), self.items.len());
                self.items.push(item);
            }
        }
    }

    pub fn items(&self) -> &[CatalogItem] {
        &self.items
    }

    #[cfg(test)]
    pub fn get(&self, url: &str) -> Option<&CatalogItem> {
        self.by_url.get(url).map(|&idx| &self.items[idx])
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn count(&self, kind: ItemKind) -> usize {
        self.items.iter().filter(|item| item.kind == kind).count()
    }

    /// Items posted at or after `since`.
    pub fn since(&self, since: DateTime<Utc>) -> Vec<&CatalogItem> {
        self.items
            .iter()
            .filter(|item| item.posted_at >= since)
            .collect()
    }
}

impl FromIterator<CatalogItem> for Catalog {
    fn from_iter<I: IntoIterator<Item = CatalogItem>>(iter: I) -> Self {
        let mut catalog = Catalog::new();
        for item in iter {
            catalog.insert(item);
        }
        catalog
    }
}

/// Shared slot holding the latest published catalog.
#[derive(Clone, Default)]
pub struct CatalogHandle {
    inner: Arc<RwLock<Arc<Catalog>>>,
}

impl CatalogHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> Arc<Catalog> {
        match self.inner.read() {
            Ok(guard) => guard.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    pub fn replace(&self, catalog: Catalog) {
        let catalog = Arc::new(catalog);
        match self.inner.write() {
            Ok(mut guard) => *guard = catalog,
            Err(poisoned) => *poisoned.into_inner() = catalog,
        }
    }
}

/// Pulls deliverable items out of one message: attachments whose content type
/// starts with `audio`, and whitespace-separated tokens starting with
/// `http://` or `https://`.
pub fn extract_items<'a>(
    content: &str,
    attachments: impl IntoIterator<Item = (&'a str, Option<&'a str>)>,
    posted_at: DateTime<Utc>,
    author_name: &str,
) -> Vec<CatalogItem> {
    let mut items = Vec::new();

    for (url, content_type) in attachments {
        if content_type.is_some_and(|ct| ct.starts_with("audio")) {
            items.push(CatalogItem {
                url: url.to_string(),
                kind: ItemKind::AudioFile,
                posted_at,
                author_name: author_name.to_string(),
            });
        }
    }

    for word in content.split_whitespace() {
        if word.starts_with("http://") || word.starts_with("https://") {
            items.push(CatalogItem {
                url: word.to_string(),
                kind: ItemKind::Link,
                posted_at,
                author_name: author_name.to_string(),
            });
        }
    }

    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 12, 0, 0).unwrap()
    }

    #[test]
    fn test_extract_audio_and_links() {
        let items = extract_items(
            "listen https://youtu.be/abc and http://bandcamp.com/x ftp://nope www.no.com",
            vec![
                ("https://cdn.discordapp.com/a/song.mp3", Some("audio/mpeg")),
                ("https://cdn.discordapp.com/a/cover.png", Some("image/png")),
                ("https://cdn.discordapp.com/a/unknown.bin", None),
            ],
            at(2024, 1, 1),
            "alice",
        );

        let audio: Vec<_> = items
            .iter()
            .filter(|i| i.kind == ItemKind::AudioFile)
            .map(|i| i.url.as_str())
            .collect();
        let links: Vec<_> = items
            .iter()
            .filter(|i| i.kind == ItemKind::Link)
            .map(|i| i.url.as_str())
            .collect();

        assert_eq!(audio, vec!["https://cdn.discordapp.com/a/song.mp3"]);
        assert_eq!(links, vec!["https://youtu.be/abc", "http://bandcamp.com/x"]);
        assert!(items.iter().all(|i| i.author_name == "alice"));
        assert!(items.iter().all(|i| i.posted_at == at(2024, 1, 1)));
    }

    #[test]
    fn test_extract_nothing() {
        let items = extract_items("just chatting", Vec::new(), at(2024, 1, 1), "bob");
        assert!(items.is_empty());
    }

    #[test]
    fn test_duplicate_url_keeps_earliest() {
        let mut catalog = Catalog::new();
        let newer = CatalogItem {
            url: "https://x/1".to_string(),
            kind: ItemKind::Link,
            posted_at: at(2024, 6, 1),
            author_name: "newer".to_string(),
        };
        let older = CatalogItem {
            posted_at: at(2024, 1, 1),
            author_name: "older".to_string(),
            ..newer.clone()
        };

        catalog.insert(newer);
        catalog.insert(older);

        assert_eq!(catalog.len(), 1);
        assert_eq!(catalog.get("https://x/1").unwrap().author_name, "older");
    }

    #[test]
    fn test_since_filter_is_inclusive() {
        let catalog: Catalog = vec![
            CatalogItem {
                url: "a".to_string(),
                kind: ItemKind::AudioFile,
                posted_at: at(2024, 1, 1),
                author_name: "x".to_string(),
            },
            CatalogItem {
                url: "b".to_string(),
                kind: ItemKind::Link,
                posted_at: at(2024, 6, 1),
                author_name: "y".to_string(),
            },
        ]
        .into_iter()
        .collect();

        let from_b = catalog.since(at(2024, 6, 1));
        assert_eq!(from_b.len(), 1);
        assert_eq!(from_b[0].url, "b");

        assert_eq!(catalog.since(DateTime::<Utc>::MIN_UTC).len(), 2);
        assert_eq!(catalog.count(ItemKind::AudioFile), 1);
        assert_eq!(catalog.count(ItemKind::Link), 1);
    }

    #[test]
    fn test_handle_replace_swaps_wholesale() {
        let handle = CatalogHandle::new();
        assert!(handle.snapshot().is_empty());

        let first: Catalog = extract_items("https://x/1", Vec::new(), at(2024, 1, 1), "a")
            .into_iter()
            .collect();
        handle.replace(first);
        let old_snapshot = handle.snapshot();
        assert_eq!(old_snapshot.len(), 1);

        handle.replace(Catalog::new());
        assert!(handle.snapshot().is_empty());
        // Readers holding the old snapshot keep it
        assert_eq!(old_snapshot.len(), 1);
    }
}
