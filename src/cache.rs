//! In-memory caching using moka
//!
//! Caches the room catalogue and room photos. Availability is never cached:
//! it is always derived from the current bookings.

use moka::future::Cache;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::time::interval;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::booking::BookingError;
use crate::db::HotelRepository;
use crate::models::{Photo, Room};

const ROOMS_KEY: &str = "rooms:all";

/// Application cache holding the room catalogue
#[derive(Clone)]
pub struct AppCache {
    /// Room listing with amenities (single key)
    pub rooms: Cache<String, Arc<Vec<Room>>>,
    /// Photos per room (room_id -> photos)
    pub photos: Cache<Uuid, Arc<Vec<Photo>>>,
}

impl AppCache {
    /// Create a new cache instance with configured TTLs
    pub fn new() -> Self {
        Self {
            // Room listing: 1 entry, 10 min TTL, invalidated on every admin write
            rooms: Cache::builder()
                .max_capacity(1)
                .time_to_live(Duration::from_secs(10 * 60))
                .build(),

            // Photos: 500 rooms, 1 hour TTL
            photos: Cache::builder()
                .max_capacity(500)
                .time_to_live(Duration::from_secs(60 * 60))
                .time_to_idle(Duration::from_secs(30 * 60))
                .build(),
        }
    }

    /// Room listing, loaded from the repository on a miss.
    ///
    /// Concurrent misses share one load, and nothing is written over an
    /// entry that is already present.
    pub async fn rooms(&self, repo: &dyn HotelRepository) -> Result<Arc<Vec<Room>>, BookingError> {
        self.rooms
            .try_get_with(ROOMS_KEY.to_string(), async {
                debug!("Cache MISS for room listing");
                repo.list_rooms().await.map(Arc::new)
            })
            .await
            .map_err(unshare)
    }

    pub async fn photos(
        &self,
        repo: &dyn HotelRepository,
        room_id: Uuid,
    ) -> Result<Arc<Vec<Photo>>, BookingError> {
        self.photos
            .try_get_with(room_id, async {
                repo.photos_for_room(room_id).await.map(Arc::new)
            })
            .await
            .map_err(unshare)
    }

    /// Get cache statistics for monitoring
    pub fn stats(&self) -> CacheStats {
        CacheStats {
            rooms_cached: self.rooms.entry_count() > 0,
            photos_size: self.photos.entry_count(),
        }
    }

    /// Drop the room listing after a room, amenity or price change
    pub async fn invalidate_rooms(&self) {
        self.rooms.invalidate(ROOMS_KEY).await;
        debug!("Room listing cache invalidated");
    }

    pub async fn invalidate_photos(&self, room_id: Uuid) {
        self.photos.invalidate(&room_id).await;
    }
}

/// Take back the loader's error; waiters that shared a failed load get a copy
fn unshare(err: Arc<BookingError>) -> BookingError {
    Arc::try_unwrap(err).unwrap_or_else(|shared| BookingError::Unavailable(shared.to_string()))
}

impl Default for AppCache {
    fn default() -> Self {
        Self::new()
    }
}

/// Cache statistics for monitoring endpoint
#[derive(Debug, Clone, Serialize)]
pub struct CacheStats {
    pub rooms_cached: bool,
    pub photos_size: u64,
}

/// Start background cache warmer
///
/// Warms the room listing on startup and reloads it every 10 minutes, once
/// the previous entry has expired.
pub async fn start_cache_warmer(cache: AppCache, repo: Arc<dyn HotelRepository>) {
    let mut interval = interval(Duration::from_secs(10 * 60));
    loop {
        // First tick completes immediately
        interval.tick().await;
        warm_cache(&cache, repo.as_ref()).await;
    }
}

async fn warm_cache(cache: &AppCache, repo: &dyn HotelRepository) {
    info!("Starting cache warm-up...");

    // Loads only when the entry has expired or been invalidated
    if let Err(e) = cache.rooms(repo).await {
        warn!("Failed to warm room cache: {}", e);
    }

    info!("Cache warm-up complete. Stats: {:?}", cache.stats());
}
