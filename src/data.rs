use std::{
    collections::HashMap,
    sync::Arc,
    time::{Duration, Instant},
};

use dashmap::DashMap;
use once_cell::sync::OnceCell;
use parking_lot::RwLock;
use tracing::warn;

use crate::{entity::WpCategory, error::WpError, wordpress::WpClient};

static SITE_DATA: OnceCell<SiteData> = OnceCell::new();

const DEFAULT_TTL: Duration = Duration::from_secs(300);

/// Initialize the process-wide data cache with the given TTL.
///
/// Only the first call takes effect.
pub fn load(ttl: Duration) {
    SITE_DATA.get_or_init(|| SiteData::new(ttl));
}

pub fn get() -> &'static SiteData {
    SITE_DATA.get_or_init(|| SiteData::new(DEFAULT_TTL))
}

/// A value which expires after the TTL.
struct TtlCell<T> {
    slot: RwLock<Option<(Instant, T)>>,
}

impl<T: Clone> TtlCell<T> {
    fn new() -> Self {
        TtlCell {
            slot: RwLock::new(None),
        }
    }

    fn fresh(&self, ttl: Duration) -> Option<T> {
        self.slot
            .read()
            .as_ref()
            .filter(|(fetched_at, _)| fetched_at.elapsed() < ttl)
            .map(|(_, value)| value.clone())
    }

    // The value regardless of its age.
    fn stale(&self) -> Option<T> {
        self.slot.read().as_ref().map(|(_, value)| value.clone())
    }

    fn set(&self, value: T) {
        *self.slot.write() = Some((Instant::now(), value));
    }
}

/// Data shared by every request: categories, category slug lookups,
/// contributors and headlines.
///
/// Failed fetches are never cached. A stale value is served if present,
/// otherwise an empty one, so that the defaults of every article apply.
pub struct SiteData {
    ttl: Duration,
    categories: TtlCell<Arc<Vec<WpCategory>>>,
    contributors: TtlCell<Arc<HashMap<u64, String>>>,
    headlines: TtlCell<Arc<Vec<String>>>,
    category_slugs: DashMap<String, (Instant, Option<WpCategory>)>,
}

impl SiteData {
    pub fn new(ttl: Duration) -> Self {
        SiteData {
            ttl,
            categories: TtlCell::new(),
            contributors: TtlCell::new(),
            headlines: TtlCell::new(),
            category_slugs: DashMap::new(),
        }
    }

    pub async fn categories(&self, client: &WpClient) -> Arc<Vec<WpCategory>> {
        if let Some(categories) = self.categories.fresh(self.ttl) {
            return categories;
        }

        match client.categories().await {
            Ok(categories) => {
                let categories = Arc::new(categories);
                self.categories.set(Arc::clone(&categories));
                categories
            }
            Err(err) => {
                warn!("Failed to fetch categories: {err}");
                self.categories.stale().unwrap_or_default()
            }
        }
    }

    /// The contributors map, id to name.
    pub async fn contributors(&self, client: &WpClient) -> Arc<HashMap<u64, String>> {
        if let Some(contributors) = self.contributors.fresh(self.ttl) {
            return contributors;
        }

        match client.contributors().await {
            Ok(contributors) => {
                let contributors = Arc::new(
                    contributors
                        .into_iter()
                        .map(|contributor| (contributor.id, contributor.name))
                        .collect::<HashMap<_, _>>(),
                );
                self.contributors.set(Arc::clone(&contributors));
                contributors
            }
            Err(err) => {
                warn!("Failed to fetch contributors: {err}");
                self.contributors.stale().unwrap_or_default()
            }
        }
    }

    /// Lookup a category by slug. A missing category is cached as well.
    pub async fn category_by_slug(
        &self,
        client: &WpClient,
        slug: &str,
    ) -> Result<Option<WpCategory>, WpError> {
        let key = slug.to_lowercase();
        if let Some(category) = self.cached_category(&key) {
            return Ok(category);
        }

        let category = client.category_by_slug(&key).await?;
        self.category_slugs
            .insert(key, (Instant::now(), category.clone()));
        Ok(category)
    }

    fn cached_category(&self, key: &str) -> Option<Option<WpCategory>> {
        // Never hold the dashmap guard across an await point.
        let entry = self.category_slugs.get(key)?;
        let (fetched_at, category) = entry.value();
        (fetched_at.elapsed() < self.ttl).then(|| category.clone())
    }

    pub fn headlines(&self) -> Option<Arc<Vec<String>>> {
        self.headlines.fresh(self.ttl)
    }

    pub fn stale_headlines(&self) -> Option<Arc<Vec<String>>> {
        self.headlines.stale()
    }

    pub fn set_headlines(&self, headlines: Vec<String>) -> Arc<Vec<String>> {
        let headlines = Arc::new(headlines);
        self.headlines.set(Arc::clone(&headlines));
        headlines
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ttl_cell() {
        let cell = TtlCell::new();
        assert_eq!(cell.fresh(DEFAULT_TTL), None);

        cell.set(42);
        assert_eq!(cell.fresh(DEFAULT_TTL), Some(42));
        // Expired, but still served as a stale value.
        assert_eq!(cell.fresh(Duration::ZERO), None);
        assert_eq!(cell.stale(), Some(42));
    }

    #[test]
    fn test_headlines() {
        let data = SiteData::new(DEFAULT_TTL);
        assert!(data.headlines().is_none());

        data.set_headlines(vec!["MUSIC: Wizkid Makes Surprise Appearance".into()]);
        assert_eq!(data.headlines().unwrap().len(), 1);

        assert_eq!(data.stale_headlines().unwrap()[0], "MUSIC: Wizkid Makes Surprise Appearance");
    }

    #[test]
    fn test_cached_category_expires() {
        let data = SiteData::new(Duration::ZERO);
        data.category_slugs
            .insert("music".into(), (Instant::now(), None));
        assert_eq!(data.cached_category("music"), None);

        let data = SiteData::new(DEFAULT_TTL);
        let music = WpCategory {
            id: 12,
            name: "Music".into(),
            slug: "music".into(),
            ..Default::default()
        };
        data.category_slugs
            .insert("music".into(), (Instant::now(), Some(music.clone())));
        assert_eq!(data.cached_category("music"), Some(Some(music)));
        assert_eq!(data.cached_category("news"), None);
    }
}
