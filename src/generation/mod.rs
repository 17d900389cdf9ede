//! Street-level view generation
//!
//! The orchestrator owns one request lifecycle at a time:
//! `Idle -> Loading -> (Success | Error)`, with cancellation from Loading
//! straight back to Idle. Results of a cancelled or superseded job are
//! dropped instead of overwriting newer state.

mod client;
mod error;
mod options;

pub use client::{GeminiClient, GeneratedImage, GenerationCall, ImageGenerator, PNG_MIME_TYPE};
pub use error::{GenerationError, MalformedResponse};
pub use options::{AspectRatio, ImageSize};

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::geo::{Direction, FantasyPoint, GeoPoint};
use crate::observable::Observable;
use crate::prompt::{build_prompt, MapSurface, PromptInput, ViewTarget};
use crate::selection::MapMode;
use crate::style::StyleChoice;

/// Identity of one generate call
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct JobId(u64);

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "job-{}", self.0)
    }
}

/// Where the requested view stands
#[derive(Debug, Clone, PartialEq)]
pub enum GenerationTarget {
    RealWorld {
        point: GeoPoint,
        surface: MapSurface,
    },
    Fantasy {
        map_name: String,
        world_context: String,
        position: FantasyPoint,
    },
}

/// Everything needed for one generation, built fresh per call
#[derive(Debug, Clone)]
pub struct GenerationRequest {
    pub target: GenerationTarget,
    pub direction: Direction,
    pub custom_prompt: Option<String>,
    pub style: StyleChoice,
    pub custom_style_text: Option<String>,
    pub aspect_ratio: AspectRatio,
    pub image_size: ImageSize,
    /// PNG bytes of the map the view is generated from
    pub source_image: Arc<[u8]>,
}

impl GenerationRequest {
    pub fn mode(&self) -> MapMode {
        match self.target {
            GenerationTarget::RealWorld { .. } => MapMode::RealWorld,
            GenerationTarget::Fantasy { .. } => MapMode::Fantasy,
        }
    }

    /// Prompt text for this request
    pub fn prompt(&self) -> String {
        let target = match &self.target {
            GenerationTarget::RealWorld { point, surface } => ViewTarget::RealWorld {
                point: *point,
                surface: *surface,
            },
            GenerationTarget::Fantasy {
                map_name,
                world_context,
                position,
            } => ViewTarget::Fantasy {
                map_name,
                world_context,
                position: *position,
            },
        };

        build_prompt(&PromptInput {
            target,
            direction: self.direction,
            style: self.style,
            custom_style_text: self.custom_style_text.as_deref(),
            custom_prompt: self.custom_prompt.as_deref(),
        })
    }
}

/// Observable generation lifecycle
#[derive(Debug, Clone, PartialEq, Default)]
pub enum GenerationState {
    #[default]
    Idle,
    Loading {
        job: JobId,
    },
    Success(GeneratedImage),
    Error(GenerationError),
}

impl GenerationState {
    pub fn is_loading(&self) -> bool {
        matches!(self, GenerationState::Loading { .. })
    }
}

struct InFlight {
    job: JobId,
    handle: JoinHandle<()>,
}

/// State shared with spawned generation tasks
struct Shared {
    state: Observable<GenerationState>,
    inflight: Mutex<Option<InFlight>>,
}

impl Shared {
    /// Publish a finished job's result if it is still the current job
    fn complete(&self, job: JobId, result: Result<GeneratedImage, GenerationError>) {
        let mut inflight = self.inflight.lock();
        match inflight.as_ref() {
            Some(current) if current.job == job => {}
            _ => {
                debug!("Discarding result of stale {}", job);
                return;
            }
        }
        *inflight = None;

        let next = match result {
            Ok(image) => {
                info!("{} succeeded ({} bytes)", job, image.bytes.len());
                GenerationState::Success(image)
            }
            Err(e) => {
                warn!("{} failed: {}", job, e);
                GenerationState::Error(e)
            }
        };
        self.state.set(next);
    }
}

/// Owns the request lifecycle against an `ImageGenerator`
pub struct GenerationOrchestrator {
    generator: Arc<dyn ImageGenerator>,
    shared: Arc<Shared>,
    next_job: AtomicU64,
}

impl fmt::Debug for GenerationOrchestrator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GenerationOrchestrator")
            .field("state", &self.shared.state.get())
            .finish()
    }
}

impl GenerationOrchestrator {
    /// Create an orchestrator over a generator
    pub fn new(generator: Arc<dyn ImageGenerator>) -> Self {
        Self {
            generator,
            shared: Arc::new(Shared {
                state: Observable::new(GenerationState::Idle),
                inflight: Mutex::new(None),
            }),
            next_job: AtomicU64::new(1),
        }
    }

    /// Current state snapshot
    pub fn state(&self) -> GenerationState {
        self.shared.state.get()
    }

    /// Subscribe to state changes
    pub fn subscribe(&self) -> tokio::sync::watch::Receiver<GenerationState> {
        self.shared.state.subscribe()
    }

    /// Whether a job is in flight
    pub fn is_busy(&self) -> bool {
        self.shared.inflight.lock().is_some()
    }

    /// Start a generation
    ///
    /// Rejects with `Busy` while another job is in flight. A missing or blank
    /// credential moves straight to the Error state without calling out. An
    /// empty source image is rejected without touching the state.
    /// Must be called from within a Tokio runtime.
    pub fn generate(
        &self,
        credential: Option<&str>,
        request: GenerationRequest,
    ) -> Result<JobId, GenerationError> {
        let mut inflight = self.shared.inflight.lock();
        if inflight.is_some() {
            warn!("Rejecting generate while a job is in flight");
            return Err(GenerationError::Busy);
        }

        let Some(api_key) = credential.map(str::trim).filter(|k| !k.is_empty()) else {
            self.shared
                .state
                .set(GenerationState::Error(GenerationError::MissingCredential));
            return Err(GenerationError::MissingCredential);
        };

        if request.source_image.is_empty() {
            warn!("Rejecting generate without a source image");
            return Err(GenerationError::MissingSourceImage);
        }

        let job = JobId(self.next_job.fetch_add(1, Ordering::Relaxed));
        let call = GenerationCall {
            api_key: api_key.to_string(),
            prompt: request.prompt(),
            source_image: request.source_image.clone(),
            aspect_ratio: request.aspect_ratio,
            image_size: request.image_size,
        };

        info!(
            "Starting {} ({:?}, {}, {:?})",
            job,
            request.mode(),
            request.direction,
            request.style
        );
        self.shared.state.set(GenerationState::Loading { job });

        let generator = self.generator.clone();
        let shared = self.shared.clone();
        let handle = tokio::spawn(async move {
            let result = generator.generate(&call).await;
            shared.complete(job, result);
        });

        *inflight = Some(InFlight { job, handle });
        Ok(job)
    }

    /// Abort the in-flight job and return to Idle
    ///
    /// Returns false when nothing was in flight.
    pub fn cancel(&self) -> bool {
        let mut inflight = self.shared.inflight.lock();
        match inflight.take() {
            Some(current) => {
                current.handle.abort();
                self.shared.state.set(GenerationState::Idle);
                info!("Cancelled {}", current.job);
                true
            }
            None => false,
        }
    }

    /// Cancel anything in flight and return to Idle
    pub fn reset(&self) {
        if !self.cancel() {
            self.shared.state.set(GenerationState::Idle);
        }
    }

    /// Wait for the current job to settle
    ///
    /// Resolves with `CancelledByUser` when the job is cancelled, and
    /// immediately with the current outcome when nothing is loading.
    pub async fn wait(&self) -> Result<GeneratedImage, GenerationError> {
        let mut rx = self.subscribe();
        let settled = match rx.wait_for(|state| !state.is_loading()).await {
            Ok(state) => state.clone(),
            Err(_) => GenerationState::Idle,
        };

        match settled {
            GenerationState::Success(image) => Ok(image),
            GenerationState::Error(e) => Err(e),
            GenerationState::Idle | GenerationState::Loading { .. } => {
                Err(GenerationError::CancelledByUser)
            }
        }
    }
}

impl Drop for GenerationOrchestrator {
    fn drop(&mut self) {
        if let Some(current) = self.shared.inflight.lock().take() {
            current.handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::time::Duration;
    use tokio::sync::Notify;

    /// Generator that waits for a release signal before answering
    struct GatedGenerator {
        gate: Arc<Notify>,
        result: Result<GeneratedImage, GenerationError>,
        calls: Mutex<Vec<GenerationCall>>,
    }

    impl GatedGenerator {
        fn new(result: Result<GeneratedImage, GenerationError>) -> Arc<Self> {
            Arc::new(Self {
                gate: Arc::new(Notify::new()),
                result,
                calls: Mutex::new(Vec::new()),
            })
        }
    }

    #[async_trait]
    impl ImageGenerator for GatedGenerator {
        async fn generate(&self, call: &GenerationCall) -> Result<GeneratedImage, GenerationError> {
            self.calls.lock().push(call.clone());
            self.gate.notified().await;
            self.result.clone()
        }
    }

    fn image(bytes: &[u8]) -> GeneratedImage {
        GeneratedImage {
            bytes: Arc::from(bytes),
            mime_type: PNG_MIME_TYPE.to_string(),
        }
    }

    fn request() -> GenerationRequest {
        GenerationRequest {
            target: GenerationTarget::RealWorld {
                point: GeoPoint::new(37.0, -122.0).unwrap(),
                surface: MapSurface::Satellite,
            },
            direction: Direction::new(45).unwrap(),
            custom_prompt: None,
            style: StyleChoice::Cinematic,
            custom_style_text: None,
            aspect_ratio: AspectRatio::Widescreen,
            image_size: ImageSize::TwoK,
            source_image: Arc::from(&b"map"[..]),
        }
    }

    #[tokio::test]
    async fn test_success_lifecycle() {
        let generator = GatedGenerator::new(Ok(image(b"view")));
        let orchestrator = GenerationOrchestrator::new(generator.clone());

        let job = orchestrator.generate(Some("key"), request()).unwrap();
        assert_eq!(orchestrator.state(), GenerationState::Loading { job });
        assert!(orchestrator.is_busy());

        // Let the task reach the gate
        tokio::task::yield_now().await;
        generator.gate.notify_one();

        let result = orchestrator.wait().await.unwrap();
        assert_eq!(&result.bytes[..], b"view");
        assert_eq!(orchestrator.state(), GenerationState::Success(image(b"view")));
        assert!(!orchestrator.is_busy());

        let calls = generator.calls.lock();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].api_key, "key");
        assert!(calls[0].prompt.contains("STYLE: Cinematic Golden Hour"));
        assert!(calls[0].prompt.contains("satellite imagery"));
    }

    #[tokio::test]
    async fn test_error_is_terminal() {
        let generator = GatedGenerator::new(Err(GenerationError::QuotaExceeded));
        let orchestrator = GenerationOrchestrator::new(generator.clone());

        orchestrator.generate(Some("key"), request()).unwrap();
        generator.gate.notify_one();

        assert_eq!(orchestrator.wait().await, Err(GenerationError::QuotaExceeded));
        assert_eq!(
            orchestrator.state(),
            GenerationState::Error(GenerationError::QuotaExceeded)
        );
        assert_eq!(generator.calls.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_missing_credential_skips_call() {
        let generator = GatedGenerator::new(Ok(image(b"view")));
        let orchestrator = GenerationOrchestrator::new(generator.clone());

        for credential in [None, Some(""), Some("   ")] {
            assert_eq!(
                orchestrator.generate(credential, request()),
                Err(GenerationError::MissingCredential)
            );
            assert_eq!(
                orchestrator.state(),
                GenerationState::Error(GenerationError::MissingCredential)
            );
        }
        assert!(generator.calls.lock().is_empty());
        assert!(!orchestrator.is_busy());
    }

    #[tokio::test]
    async fn test_empty_source_image_rejected() {
        let generator = GatedGenerator::new(Ok(image(b"view")));
        let orchestrator = GenerationOrchestrator::new(generator.clone());

        let mut req = request();
        req.source_image = Arc::from(Vec::new());
        assert_eq!(
            orchestrator.generate(Some("key"), req),
            Err(GenerationError::MissingSourceImage)
        );
        assert_eq!(orchestrator.state(), GenerationState::Idle);
        assert!(generator.calls.lock().is_empty());
    }

    #[tokio::test]
    async fn test_busy_rejection_keeps_first_job() {
        let generator = GatedGenerator::new(Ok(image(b"first")));
        let orchestrator = GenerationOrchestrator::new(generator.clone());

        let job = orchestrator.generate(Some("key"), request()).unwrap();
        assert_eq!(
            orchestrator.generate(Some("key"), request()),
            Err(GenerationError::Busy)
        );
        assert_eq!(orchestrator.state(), GenerationState::Loading { job });

        generator.gate.notify_one();
        assert!(orchestrator.wait().await.is_ok());
    }

    #[tokio::test]
    async fn test_cancel_returns_to_idle_and_ignores_late_result() {
        let generator = GatedGenerator::new(Ok(image(b"late")));
        let orchestrator = GenerationOrchestrator::new(generator.clone());

        orchestrator.generate(Some("key"), request()).unwrap();
        tokio::task::yield_now().await;

        assert!(orchestrator.cancel());
        assert_eq!(orchestrator.state(), GenerationState::Idle);
        assert!(!orchestrator.cancel());

        // Releasing the gate after cancel must not surface anything
        generator.gate.notify_one();
        tokio::time::sleep(Duration::from_millis(20)).await;
        assert_eq!(orchestrator.state(), GenerationState::Idle);
    }

    #[tokio::test]
    async fn test_stale_completion_is_discarded() {
        let generator = GatedGenerator::new(Ok(image(b"x")));
        let orchestrator = GenerationOrchestrator::new(generator.clone());

        let first = orchestrator.generate(Some("key"), request()).unwrap();
        orchestrator.cancel();
        let second = orchestrator.generate(Some("key"), request()).unwrap();
        assert_ne!(first, second);

        // A response for the cancelled job arrives after the new one started
        orchestrator.shared.complete(first, Ok(image(b"stale")));
        assert_eq!(orchestrator.state(), GenerationState::Loading { job: second });

        orchestrator.cancel();
        orchestrator.shared.complete(second, Ok(image(b"stale")));
        assert_eq!(orchestrator.state(), GenerationState::Idle);
    }

    #[tokio::test]
    async fn test_wait_reports_cancellation() {
        let generator = GatedGenerator::new(Ok(image(b"x")));
        let orchestrator = Arc::new(GenerationOrchestrator::new(generator.clone()));
        orchestrator.generate(Some("key"), request()).unwrap();

        let waiter = {
            let orchestrator = orchestrator.clone();
            tokio::spawn(async move { orchestrator.wait().await })
        };
        tokio::task::yield_now().await;
        orchestrator.cancel();

        assert_eq!(waiter.await.unwrap(), Err(GenerationError::CancelledByUser));
    }

    #[tokio::test]
    async fn test_reset_clears_error() {
        let generator = GatedGenerator::new(Ok(image(b"x")));
        let orchestrator = GenerationOrchestrator::new(generator);
        let _ = orchestrator.generate(None, request());
        orchestrator.reset();
        assert_eq!(orchestrator.state(), GenerationState::Idle);
    }
}
