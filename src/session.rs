//! Per-shot editing state.
//!
//! Every shot owns one [`ShotSession`] inside a [`SessionStore`]. Controls read
//! and write the session of the shot they belong to, so concurrent shots never
//! share values.

use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

use crate::motion::{InferenceLog, MotionContext, SimpleMotionParams, TransformError, TransformResult};

/// Largest key-frame count a session is sized for
pub const MAX_KEY_FRAMES: usize = 1000;

// Control defaults for frames the loaded settings do not cover
const DEFAULT_STRENGTH: f64 = 1.0;
const DEFAULT_MOTION: f64 = 1.0;
const DEFAULT_FREEDOM: f64 = 0.5;
const DEFAULT_SPEED: f64 = 0.5;
const DEFAULT_DISTANCE: f64 = 1.0;
const DEFAULT_ADHERENCE: f64 = 0.6;

/// Control values of one shot.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShotSession {
    // one per key frame
    pub strengths: Vec<f64>,
    pub prompts: Vec<String>,
    pub negative_prompts: Vec<String>,
    pub motions: Vec<f64>,
    // one per adjacent pair
    pub freedoms: Vec<f64>,
    pub distances: Vec<f64>,
    pub speeds: Vec<f64>,
    /// Position in the Low / Standard / High selector
    pub motion_context_index: usize,
    pub strength_of_adherence: f64,
    pub buffer: i64,
}

impl ShotSession {
    /// Fresh controls for a shot with `frame_count` key frames.
    pub fn new(frame_count: usize) -> Self {
        let pairs = frame_count.saturating_sub(1);
        Self {
            strengths: vec![DEFAULT_STRENGTH; frame_count],
            prompts: vec![String::new(); frame_count],
            negative_prompts: vec![String::new(); frame_count],
            motions: vec![DEFAULT_MOTION; frame_count],
            freedoms: vec![DEFAULT_FREEDOM; pairs],
            distances: vec![DEFAULT_DISTANCE; pairs],
            speeds: vec![DEFAULT_SPEED; pairs],
            motion_context_index: MotionContext::default().selector_index(),
            strength_of_adherence: DEFAULT_ADHERENCE,
            buffer: 0,
        }
    }

    /// Controls for `frame_count` key frames, filled from previously used settings.
    ///
    /// Values missing from `simple` keep their defaults; prompt lists shorter
    /// than the frame list are padded with empty strings.
    pub fn load_from_settings(simple: &SimpleMotionParams, frame_count: usize) -> Self {
        let mut session = Self::new(frame_count);

        for idx in 0..frame_count {
            if let Some(v) = simple.strength_of_frames.get(idx) {
                session.strengths[idx] = *v;
            }
            if let Some(v) = simple.motions_during_frames.get(idx) {
                session.motions[idx] = *v;
            }
            if let Some(v) = simple.individual_prompts.get(idx) {
                session.prompts[idx] = v.clone();
            }
            if let Some(v) = simple.individual_negative_prompts.get(idx) {
                session.negative_prompts[idx] = v.clone();
            }

            if idx + 1 < frame_count {
                if let Some(v) = simple.freedom_between_frames.get(idx) {
                    session.freedoms[idx] = *v;
                }
                if let Some(v) = simple.distance_to_next_frames.get(idx) {
                    session.distances[idx] = *v;
                }
                if let Some(v) = simple.speed_of_transitions.get(idx) {
                    session.speeds[idx] = *v;
                }
            }
        }

        session.motion_context_index = simple.type_of_motion_context.selector_index();
        session.strength_of_adherence = simple.strength_of_adherence;
        session.buffer = simple.buffer;
        session
    }

    pub fn frame_count(&self) -> usize {
        self.strengths.len()
    }

    pub fn motion_context(&self) -> MotionContext {
        MotionContext::from_selector_index(self.motion_context_index)
    }

    /// Current controls as forward-transform input.
    pub fn to_simple_params(&self) -> SimpleMotionParams {
        SimpleMotionParams {
            strength_of_frames: self.strengths.clone(),
            freedom_between_frames: self.freedoms.clone(),
            speed_of_transitions: self.speeds.clone(),
            distance_to_next_frames: self.distances.clone(),
            type_of_motion_context: self.motion_context(),
            strength_of_adherence: self.strength_of_adherence,
            individual_prompts: self.prompts.clone(),
            individual_negative_prompts: self.negative_prompts.clone(),
            motions_during_frames: self.motions.clone(),
            buffer: self.buffer,
        }
    }
}

/// Session holding the settings stored in `log`, `None` when the log has none.
///
/// `frame_count` of `None` sizes the session from the log itself. Counts above
/// [`MAX_KEY_FRAMES`] are rejected before the session is allocated.
pub fn session_from_log(log: &InferenceLog, frame_count: Option<usize>) -> TransformResult<Option<ShotSession>> {
    let Some(simple) = log.load_simple_params()? else {
        return Ok(None);
    };
    let frames = frame_count.unwrap_or_else(|| simple.frame_count());
    if frames > MAX_KEY_FRAMES {
        return Err(TransformError::OutOfRange {
            field: "frame_count",
            value: frames as f64,
        });
    }
    Ok(Some(ShotSession::load_from_settings(&simple, frames)))
}

/// Sessions of all open shots.
#[derive(Debug, Default)]
pub struct SessionStore {
    shots: HashMap<Uuid, ShotSession>,
    /// Buffer given to sessions created with defaults
    default_buffer: i64,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_default_buffer(mut self, buffer: i64) -> Self {
        self.default_buffer = buffer;
        self
    }

    pub fn get(&self, shot: &Uuid) -> Option<&ShotSession> {
        self.shots.get(shot)
    }

    pub fn get_mut(&mut self, shot: &Uuid) -> Option<&mut ShotSession> {
        self.shots.get_mut(shot)
    }

    /// Session for `shot`, created with defaults on first access.
    pub fn get_or_create(&mut self, shot: Uuid, frame_count: usize) -> &mut ShotSession {
        let buffer = self.default_buffer;
        self.shots.entry(shot).or_insert_with(|| {
            debug!("New session for shot {}", shot);
            ShotSession {
                buffer,
                ..ShotSession::new(frame_count)
            }
        })
    }

    pub fn insert(&mut self, shot: Uuid, session: ShotSession) -> Option<ShotSession> {
        self.shots.insert(shot, session)
    }

    pub fn remove(&mut self, shot: &Uuid) -> Option<ShotSession> {
        self.shots.remove(shot)
    }

    pub fn len(&self) -> usize {
        self.shots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.shots.is_empty()
    }

    /// Replace the session of `shot` with the settings stored in `log`.
    ///
    /// Sized as in [`session_from_log`]. Returns false (session untouched)
    /// when the log holds no settings.
    pub fn load_from_log(
        &mut self,
        shot: Uuid,
        log: &InferenceLog,
        frame_count: Option<usize>,
    ) -> TransformResult<bool> {
        let Some(session) = session_from_log(log, frame_count)? else {
            info!("No data available for shot {}", shot);
            return Ok(false);
        };
        info!("Loaded {} frame settings into shot {}", session.frame_count(), shot);
        self.insert(shot, session);
        Ok(true)
    }
}
