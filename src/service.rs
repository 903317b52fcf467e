//! RPC contract and server-side service
//!
//! The [`ChargingService`] trait is the transport-agnostic contract: any
//! RPC mechanism that can deliver these three calls and return the typed
//! fault satisfies it. [`SessionService`] is the server side, wrapping the
//! one controller instance behind a mutex so the three operations are
//! strictly serialized.

use crate::controller::SessionController;
use crate::error::Result;
use crate::sample::ChargingSample;
use async_trait::async_trait;
use std::sync::Arc;
use tokio::sync::Mutex;

/// The charging session contract crossed by the RPC boundary
#[async_trait]
pub trait ChargingService: Send + Sync {
    /// Begin a session for one vehicle; fails if one is already active
    async fn start_session(&self, vehicle_id: &str) -> Result<()>;

    /// Deliver one telemetry row into the active session
    async fn push_sample(&self, sample: ChargingSample) -> Result<()>;

    /// End the active session for the given vehicle
    async fn end_session(&self, vehicle_id: &str) -> Result<()>;
}

/// Server-side service: one controller, externally serialized
#[derive(Clone)]
pub struct SessionService {
    controller: Arc<Mutex<SessionController>>,
}

impl SessionService {
    /// Wrap a controller for shared use by transports
    pub fn new(controller: SessionController) -> Self {
        Self {
            controller: Arc::new(Mutex::new(controller)),
        }
    }

    /// Shared handle to the underlying controller
    pub fn controller(&self) -> Arc<Mutex<SessionController>> {
        Arc::clone(&self.controller)
    }
}

#[async_trait]
impl ChargingService for SessionService {
    async fn start_session(&self, vehicle_id: &str) -> Result<()> {
        self.controller.lock().await.start_session(vehicle_id)
    }

    async fn push_sample(&self, sample: ChargingSample) -> Result<()> {
        self.controller.lock().await.push_sample(&sample)
    }

    async fn end_session(&self, vehicle_id: &str) -> Result<()> {
        self.controller.lock().await.end_session(vehicle_id)
    }
}
