//! REST API implementation using rouille.
//!
//! # Key types
//!
//! - [`ApiServer`] - HTTP server runner, spawns background thread
//! - [`SharedApiState`] - per-shot sessions and settings shared by all handlers
//!
//! # Thread safety
//!
//! - rouille serves requests on a thread pool; `SharedApiState` guards each
//!   field with a `RwLock`
//! - transforms and log parsing are pure and run before any lock is taken
//! - CORS headers added to all responses for browser access

use rouille::{Request, Response};
use serde::{Deserialize, Serialize};
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};
use std::thread;
use uuid::Uuid;

use crate::interpolator::interpolation_steps;
use crate::motion::{
    ExpandedMotionParams, ForwardTransform, InferenceLog, ReverseTransform, SimpleMotionParams,
};
use crate::session::{SessionStore, session_from_log};
use crate::settings::AppSettings;

/// State shared by API handlers
pub struct SharedApiState {
    pub sessions: RwLock<SessionStore>,
    pub settings: RwLock<AppSettings>,
}

impl Default for SharedApiState {
    fn default() -> Self {
        Self::new(AppSettings::default())
    }
}

impl SharedApiState {
    pub fn new(settings: AppSettings) -> Self {
        Self {
            sessions: RwLock::new(SessionStore::new().with_default_buffer(settings.buffer)),
            settings: RwLock::new(settings),
        }
    }

    // A panicked handler leaves plain data behind, keep serving it
    fn sessions(&self) -> RwLockReadGuard<'_, SessionStore> {
        self.sessions.read().unwrap_or_else(|e| e.into_inner())
    }

    fn sessions_mut(&self) -> RwLockWriteGuard<'_, SessionStore> {
        self.sessions.write().unwrap_or_else(|e| e.into_inner())
    }

    fn settings(&self) -> AppSettings {
        self.settings.read().unwrap_or_else(|e| e.into_inner()).clone()
    }
}

/// Request body for the forward transform
#[derive(Debug, Deserialize)]
struct ForwardRequest {
    params: SimpleMotionParams,
    /// Defaults to the number of frame strengths
    #[serde(default)]
    frame_count: Option<usize>,
}

/// Request body for loading a shot from an inference log
#[derive(Debug, Deserialize)]
struct LoadLogRequest {
    #[serde(flatten)]
    log: InferenceLog,
    /// Key frames of the shot, defaults to the frames found in the log
    #[serde(default)]
    frame_count: Option<usize>,
}

#[derive(Debug, Serialize)]
struct StepsResponse {
    seconds: f64,
    steps: u32,
}

/// Generic API response
#[derive(Serialize)]
struct ApiResponse {
    success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

impl ApiResponse {
    fn ok_msg(msg: &str) -> Self {
        Self { success: true, message: Some(msg.to_string()), error: None }
    }

    fn err(msg: &str) -> Self {
        Self { success: false, message: None, error: Some(msg.to_string()) }
    }
}

fn bad_request(msg: &str) -> Response {
    Response::json(&ApiResponse::err(msg)).with_status_code(400)
}

fn not_found(msg: &str) -> Response {
    Response::json(&ApiResponse::err(msg)).with_status_code(404)
}

/// REST API server
pub struct ApiServer {
    port: u16,
    state: Arc<SharedApiState>,
}

impl ApiServer {
    pub fn new(port: u16, state: Arc<SharedApiState>) -> Self {
        Self { port, state }
    }

    /// Start the API server in a background thread.
    pub fn start(port: u16, state: Arc<SharedApiState>) -> thread::JoinHandle<()> {
        let server = ApiServer::new(port, state);
        thread::spawn(move || {
            server.run();
        })
    }

    /// Serve on the calling thread until the process exits.
    pub fn run(self) {
        let addr = format!("0.0.0.0:{}", self.port);
        log::info!("API server starting on http://{}", addr);

        let state = self.state;
        rouille::start_server(&addr, move |request| {
            Self::handle_request(request, &state)
        });
    }

    pub(crate) fn handle_request(request: &Request, state: &Arc<SharedApiState>) -> Response {
        // Handle preflight
        if request.method() == "OPTIONS" {
            return Response::empty_204()
                .with_additional_header("Access-Control-Allow-Origin", "*")
                .with_additional_header("Access-Control-Allow-Methods", "GET, POST, OPTIONS")
                .with_additional_header("Access-Control-Allow-Headers", "Content-Type");
        }

        log::debug!("{} {}", request.method(), request.url());
        Self::route(request, state).with_additional_header("Access-Control-Allow-Origin", "*")
    }

    fn route(request: &Request, state: &Arc<SharedApiState>) -> Response {
        // Handle paths with parameters manually (router! doesn't capture well)
        let path = request.url();
        match request.method() {
            "POST" => {
                if let Some(uuid_str) = path.strip_prefix("/api/log/load/") {
                    return match Uuid::parse_str(uuid_str) {
                        Ok(shot) => Self::handle_load_log(request, state, shot),
                        Err(_) => bad_request("Invalid shot uuid"),
                    };
                }
            }
            "GET" => {
                if let Some(uuid_str) = path.strip_prefix("/api/session/") {
                    return match Uuid::parse_str(uuid_str) {
                        Ok(shot) => Self::get_session(state, shot),
                        Err(_) => bad_request("Invalid shot uuid"),
                    };
                }
                if let Some(secs_str) = path.strip_prefix("/api/steps/") {
                    return match secs_str.parse::<f64>() {
                        Ok(seconds) if seconds.is_finite() && seconds >= 0.0 => {
                            Response::json(&StepsResponse {
                                seconds,
                                steps: interpolation_steps(seconds),
                            })
                        }
                        _ => bad_request("Invalid duration"),
                    };
                }
            }
            _ => {}
        }

        rouille::router!(request,
            (GET) ["/api/health"] => {
                Response::json(&ApiResponse::ok_msg("frameweave API server"))
            },
            (POST) ["/api/transform/forward"] => {
                Self::handle_forward(request, state)
            },
            (POST) ["/api/transform/reverse"] => {
                Self::handle_reverse(request)
            },
            _ => {
                not_found("Not found")
            }
        )
    }

    fn handle_forward(request: &Request, state: &Arc<SharedApiState>) -> Response {
        let req = match rouille::input::json_input::<ForwardRequest>(request) {
            Ok(req) => req,
            Err(e) => return bad_request(&format!("Invalid JSON: {}", e)),
        };
        let context_length = state.settings().context_length;
        let frames = req.frame_count.unwrap_or_else(|| req.params.frame_count());

        match ForwardTransform::new(req.params.buffer)
            .with_context_length(context_length)
            .apply(&req.params, frames)
        {
            Ok(expanded) => Response::json(&expanded),
            Err(e) => bad_request(&e.to_string()),
        }
    }

    fn handle_reverse(request: &Request) -> Response {
        let expanded = match rouille::input::json_input::<ExpandedMotionParams>(request) {
            Ok(expanded) => expanded,
            Err(e) => return bad_request(&format!("Invalid JSON: {}", e)),
        };
        match ReverseTransform::new(expanded.buffer).apply(&expanded) {
            Ok(simple) => Response::json(&simple),
            Err(e) => bad_request(&e.to_string()),
        }
    }

    fn handle_load_log(request: &Request, state: &Arc<SharedApiState>, shot: Uuid) -> Response {
        let req = match rouille::input::json_input::<LoadLogRequest>(request) {
            Ok(req) => req,
            Err(e) => return bad_request(&format!("Invalid JSON: {}", e)),
        };

        let session = match session_from_log(&req.log, req.frame_count) {
            Ok(Some(session)) => session,
            Ok(None) => return not_found("No data available"),
            Err(e) => return bad_request(&e.to_string()),
        };
        log::info!("Loaded {} frame settings into shot {}", session.frame_count(), shot);
        let response = Response::json(&session);
        state.sessions_mut().insert(shot, session);
        response
    }

    fn get_session(state: &Arc<SharedApiState>, shot: Uuid) -> Response {
        match state.sessions().get(&shot) {
            Some(session) => Response::json(session),
            None => not_found("Session not found"),
        }
    }
}
