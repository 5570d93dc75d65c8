use crate::acquisition::{AcquisitionError, LocationService};
use crate::domain::{AcquisitionMethod, Coordinate, Location, SurveyPoint};
use crate::geometry;
use chrono::Utc;
use std::collections::HashMap;
use thiserror::Error;
use tokio::sync::watch::Receiver;
use tokio::sync::{Mutex, RwLock};
use tracing::{info, instrument};

/// The building footprint locks once this many vertices were collected.
pub const AREA_VERTEX_COUNT: usize = 4;

/// One survey workflow: collect exactly four area vertices, then register
/// classified measurement points against the locked polygon. Each session
/// exclusively owns its polygon and point collection; nothing is shared
/// across sessions.
#[derive(Debug)]
pub struct SurveySession {
    service: LocationService,
    state: RwLock<SessionState>,
    // Held across an acquisition so a concurrent second one fails fast
    acquisition_guard: Mutex<()>,
}

#[derive(Debug)]
struct SessionState {
    method: AcquisitionMethod,
    vertices: Vec<Location>,
    area_defined: bool,
    points: HashMap<String, SurveyPoint>,
}

/// Outcome of a successful vertex registration.
#[derive(Clone, Debug, PartialEq)]
pub struct VertexRegistration {
    pub location: Location,
    pub step: usize,
    pub area_defined: bool,
}

impl SurveySession {
    pub fn new(service: LocationService) -> Self {
        SurveySession {
            service,
            state: RwLock::new(SessionState {
                method: AcquisitionMethod::EnhancedGps,
                vertices: Vec::with_capacity(AREA_VERTEX_COUNT),
                area_defined: false,
                points: HashMap::new(),
            }),
            acquisition_guard: Mutex::new(()),
        }
    }

    pub async fn select_method(&self, method: AcquisitionMethod) {
        self.state.write().await.method = method;
        info!("Selected acquisition method {}", method);
    }

    pub async fn method(&self) -> AcquisitionMethod {
        self.state.read().await.method
    }

    /// Live accuracy of incoming readings during an enhanced-GPS acquisition.
    pub fn accuracy_updates(&self) -> Receiver<f64> {
        self.service.accuracy_updates()
    }

    /// Acquires one location with the selected method and appends it as the
    /// next area vertex. The fourth vertex locks the polygon. On acquisition
    /// failure no vertex is added.
    #[instrument(skip(self))]
    pub async fn register_area_vertex(&self) -> Result<VertexRegistration, SessionError> {
        let _guard = self.acquisition_guard.try_lock().map_err(|_| SessionError::AcquisitionInProgress)?;

        let method = {
            let state = self.state.read().await;
            if state.area_defined {
                return Err(SessionError::AreaAlreadyDefined);
            }
            state.method
        };

        let location = self.service.acquire(method).await?;

        let mut state = self.state.write().await;
        state.vertices.push(location.clone());
        let step = state.vertices.len();
        if step == AREA_VERTEX_COUNT {
            state.area_defined = true;
            info!("🏁 Vertex {}/{} registered, building area defined", step, AREA_VERTEX_COUNT);
        } else {
            info!("🏁 Vertex {}/{} registered at ±{}m", step, AREA_VERTEX_COUNT, location.accuracy_m);
        }

        Ok(VertexRegistration {
            location,
            step,
            area_defined: state.area_defined,
        })
    }

    /// Acquires one location, classifies it against the locked polygon and
    /// records it under `id`, replacing any earlier point with the same id.
    #[instrument(skip(self))]
    pub async fn register_point(&self, id: &str) -> Result<SurveyPoint, SessionError> {
        let _guard = self.acquisition_guard.try_lock().map_err(|_| SessionError::AcquisitionInProgress)?;

        let (method, vertices) = {
            let state = self.state.read().await;
            if !state.area_defined {
                return Err(SessionError::AreaNotDefined);
            }
            (state.method, state.vertices.iter().map(|v| v.coordinate).collect::<Vec<Coordinate>>())
        };

        let location = self.service.acquire(method).await?;

        let inside = geometry::point_in_polygon(location.coordinate, &vertices);
        let vertex_distances = vertices.iter().map(|&vertex| geometry::haversine_distance(location.coordinate, vertex)).collect();
        let side_distances = (0..vertices.len())
            .map(|i| geometry::distance_to_segment(location.coordinate, vertices[i], vertices[(i + 1) % vertices.len()]))
            .collect();

        let point = SurveyPoint {
            id: id.to_string(),
            location,
            inside,
            vertex_distances,
            side_distances,
            timestamp: Utc::now(),
        };

        info!("📌 Point '{}' registered: {}", id, if inside { "INSIDE" } else { "OUTSIDE" });
        self.state.write().await.points.insert(point.id.clone(), point.clone());
        Ok(point)
    }

    /// Discards the polygon and returns to collecting the first vertex.
    /// Registered points are kept; only the area is cleared.
    #[instrument(skip(self))]
    pub async fn reset_area(&self) {
        let mut state = self.state.write().await;
        state.vertices.clear();
        state.area_defined = false;
        info!("🔄 Building area reset");
    }

    pub async fn is_area_defined(&self) -> bool {
        self.state.read().await.area_defined
    }

    /// The vertex to collect next, 1-based. Stays at the vertex count once
    /// the area is defined.
    pub async fn step(&self) -> usize {
        let state = self.state.read().await;
        (state.vertices.len() + 1).min(AREA_VERTEX_COUNT)
    }

    pub async fn vertices(&self) -> Vec<Location> {
        self.state.read().await.vertices.clone()
    }

    /// Registered points ordered by id.
    pub async fn points(&self) -> Vec<SurveyPoint> {
        let state = self.state.read().await;
        let mut points: Vec<SurveyPoint> = state.points.values().cloned().collect();
        points.sort_by(|a, b| a.id.cmp(&b.id));
        points
    }
}

#[derive(Error, Debug, PartialEq)]
pub enum SessionError {
    #[error("the building area has not been defined yet")]
    AreaNotDefined,
    #[error("the building area is already defined, reset it first")]
    AreaAlreadyDefined,
    #[error("another acquisition is already in progress")]
    AcquisitionInProgress,
    #[error(transparent)]
    Acquisition(#[from] AcquisitionError),
}
