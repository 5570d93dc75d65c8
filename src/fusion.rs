use crate::acquisition::positioning::{PositioningError, ReadingStream};
use crate::domain::{AcquisitionMethod, Coordinate, Location, LocationMetadata, Reading};
use futures::StreamExt;
use ordered_float::OrderedFloat;
use serde::Deserialize;
use std::time::Duration;
use thiserror::Error;
use tokio::sync::watch::Sender;
use tokio::time::{Instant, timeout_at};
use tracing::{debug, info, instrument, warn};

#[derive(Clone, Debug, Deserialize)]
pub struct FusionSettings {
    /// Collection stops as soon as this many readings arrived.
    pub max_readings: usize,
    /// Readings at or below this accuracy count as precise.
    pub precise_accuracy_m: f64,
    /// Minimum number of precise readings required to fuse from the precise subset only.
    pub min_precise_readings: usize,
    /// At most this many readings contribute to the weighted average.
    pub selection_size: usize,
    /// Collection stops when this much time elapsed, whatever arrived so far.
    #[serde(with = "humantime_serde")]
    pub deadline: Duration,
}

impl Default for FusionSettings {
    fn default() -> Self {
        FusionSettings {
            max_readings: 8,
            precise_accuracy_m: 15.0,
            min_precise_readings: 3,
            selection_size: 5,
            deadline: Duration::from_secs(40),
        }
    }
}

/// Collects readings from a positioning stream until either `max_readings`
/// arrived or the deadline passed, then fuses them into a single location via
/// an inverse-accuracy weighted average.
///
/// The stream is dropped on whichever bound is reached first, which cancels
/// the underlying subscription. A stream error with at least one reading
/// already collected is downgraded to a partial fusion; with none, it is
/// propagated. Each incoming reading's accuracy is published to `progress`
/// without ever blocking collection.
#[instrument(skip_all)]
pub async fn fuse(mut stream: ReadingStream, settings: &FusionSettings, progress: &Sender<f64>) -> Result<Location, FusionError> {
    info!("📡 Collecting up to {} positioning readings...", settings.max_readings);
    let deadline = Instant::now() + settings.deadline;
    let mut readings: Vec<Reading> = Vec::with_capacity(settings.max_readings);

    while readings.len() < settings.max_readings {
        match timeout_at(deadline, stream.next()).await {
            Ok(Some(Ok(reading))) => {
                debug!("📡 Reading {} with accuracy ±{}m", readings.len() + 1, reading.accuracy);
                progress.send(reading.accuracy).unwrap_or_default();
                readings.push(reading);
            }
            Ok(Some(Err(e))) if readings.is_empty() => {
                warn!("📡 Positioning stream failed before the first reading: {}", e);
                return Err(FusionError::Source(e));
            }
            Ok(Some(Err(e))) => {
                warn!("📡 Positioning stream failed, fusing {} partial reading(s): {}", readings.len(), e);
                break;
            }
            Ok(None) => {
                debug!("📡 Positioning stream ended after {} reading(s)", readings.len());
                break;
            }
            Err(_) => {
                debug!("📡 Deadline reached with {} reading(s)", readings.len());
                break;
            }
        }
    }
    drop(stream); // Cancels the subscription

    if readings.is_empty() {
        return Err(FusionError::NoSignal);
    }

    let selected = select_readings(&readings, settings);
    let location = fuse_selected(&selected, readings.len());
    info!("📡 Collecting up to {} positioning readings... OK, fused {} of {} at ±{}m", settings.max_readings, selected.len(), readings.len(), location.accuracy_m);
    Ok(location)
}

/// Inverse-accuracy weighted average over the selected readings. The reported
/// accuracy is the best one observed among them, not a fused uncertainty
/// bound.
fn fuse_selected(selected: &[&Reading], total_readings: usize) -> Location {
    let mut total_weight = 0.0;
    let mut weighted_lat = 0.0;
    let mut weighted_lng = 0.0;

    for reading in selected {
        let weight = 1.0 / (reading.accuracy + 1.0);
        weighted_lat += reading.lat * weight;
        weighted_lng += reading.lng * weight;
        total_weight += weight;
    }

    let best_accuracy = selected.iter().map(|r| OrderedFloat(r.accuracy)).min().map(|a| a.into_inner()).unwrap_or(f64::INFINITY);

    Location {
        coordinate: Coordinate {
            lat: weighted_lat / total_weight,
            lng: weighted_lng / total_weight,
        },
        accuracy_m: best_accuracy,
        method: AcquisitionMethod::EnhancedGps,
        metadata: LocationMetadata::Fusion {
            readings_used: selected.len(),
            total_readings,
        },
    }
}

/// Selects the readings to fuse: the `selection_size` most precise from the
/// precise subset when it has at least `min_precise_readings` members, else
/// from all collected readings. Sorting is stable, so equally accurate
/// readings keep arrival order.
fn select_readings<'a>(readings: &'a [Reading], settings: &FusionSettings) -> Vec<&'a Reading> {
    let mut precise: Vec<&Reading> = readings.iter().filter(|r| r.accuracy <= settings.precise_accuracy_m).collect();
    precise.sort_by_key(|r| OrderedFloat(r.accuracy));

    let mut pool = if precise.len() >= settings.min_precise_readings {
        precise
    } else {
        let mut all: Vec<&Reading> = readings.iter().collect();
        all.sort_by_key(|r| OrderedFloat(r.accuracy));
        all
    };

    pool.truncate(settings.selection_size);
    pool
}

#[derive(Error, Debug)]
pub enum FusionError {
    #[error("no positioning readings received")]
    NoSignal,
    #[error(transparent)]
    Source(#[from] PositioningError),
}
