//! Interpolation request packaging and dispatch.
//!
//! Creative interpolation sends the expanded motion settings to the inference
//! backend once per requested variant. Direct morphing cross-fades two key
//! frames locally; encoding those frames into a video is left to the caller.

use anyhow::{Context, Result, bail};
use image::{DynamicImage, RgbaImage};
use indexmap::IndexMap;
use log::{debug, info};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::PathBuf;
use uuid::Uuid;

use crate::motion::keys::{K_BUFFER, K_QUEUE_INFERENCE};
use crate::motion::{ExpandedMotionParams, ForwardTransform, InferenceLog, SimpleMotionParams};
use crate::settings::{AppSettings, BackendConfig};

/// Backend model that runs creative interpolation
pub const AD_INTERPOLATION_MODEL: &str = "ad_interpolation";

/// Interpolated frames per clip for a clip duration in seconds.
pub fn interpolation_steps(clip_duration: f64) -> u32 {
    const STEPS: [(f64, u32); 6] = [
        (0.17, 2),
        (0.3, 3),
        (0.57, 4),
        (1.1, 5),
        (2.17, 6),
        (4.3, 7),
    ];
    STEPS
        .iter()
        .find(|(limit, _)| clip_duration < *limit)
        .map(|(_, steps)| *steps)
        .unwrap_or(8)
}

/// How a clip between key frames is produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum AnimationStyle {
    #[default]
    #[serde(rename = "Creative Interpolation")]
    CreativeInterpolation,
    #[serde(rename = "Direct Morphing")]
    DirectMorphing,
}

/// Request handed to the inference backend.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct InterpolationRequest {
    pub model: String,
    pub prompt: String,
    /// Flat request fields, in insertion order
    pub data: IndexMap<String, Value>,
}

impl InterpolationRequest {
    /// Assemble the interpolation request: backend config, expanded motion
    /// settings under their wire names, then one `file_image_NNN_uuid` per key frame.
    pub fn interpolation(
        backend: &BackendConfig,
        expanded: &ExpandedMotionParams,
        image_uuids: &[Uuid],
        queue_inference: bool,
    ) -> Result<Self> {
        let mut data = IndexMap::new();

        let Value::Object(backend_fields) = serde_json::to_value(backend)? else {
            bail!("backend config did not serialize to an object");
        };
        data.extend(backend_fields);

        let Value::Object(motion_fields) = serde_json::to_value(expanded)? else {
            bail!("motion settings did not serialize to an object");
        };
        data.extend(motion_fields);

        let max_frames = expanded
            .dynamic_frame_distribution_values
            .last()
            .map(|last| last + 1)
            .unwrap_or(0);
        data.insert("max_frames".to_string(), Value::from(max_frames));
        data.insert(K_BUFFER.to_string(), Value::from(expanded.buffer));
        data.insert(K_QUEUE_INFERENCE.to_string(), Value::from(queue_inference));

        for (idx, uuid) in image_uuids.iter().enumerate() {
            data.insert(image_key(idx + 1), Value::from(uuid.to_string()));
        }

        Ok(Self {
            model: AD_INTERPOLATION_MODEL.to_string(),
            prompt: "SM".to_string(),
            data,
        })
    }
}

/// `file_image_001_uuid` style key for a 1-based image index.
pub fn image_key(index: usize) -> String {
    format!("file_image_{:03}_uuid", index)
}

/// Result of one inference call.
#[derive(Debug, Clone, PartialEq)]
pub enum InferenceOutcome {
    /// Finished synchronously; `log` records the settings that produced `output`
    Completed { output: Value, log: InferenceLog },
    /// Accepted into the backend queue
    Queued { job_id: String },
}

/// Inference backend executing model predictions.
pub trait InferenceClient {
    fn predict(&self, request: &InterpolationRequest) -> Result<InferenceOutcome>;
}

/// Everything needed to produce one clip.
pub struct ClipJob<'a> {
    pub params: &'a SimpleMotionParams,
    pub settings: &'a AppSettings,
    /// Key-frame image ids, uploaded to the backend beforehand
    pub image_uuids: &'a [Uuid],
    /// Local key-frame images for direct morphing
    pub image_paths: &'a [PathBuf],
    /// Frames produced by direct morphing
    pub interpolation_steps: u32,
}

/// One produced variant.
#[derive(Debug)]
pub enum ClipOutput {
    Inference(InferenceOutcome),
    Frames(Vec<RgbaImage>),
}

/// Produce clip variants in the configured animation style.
pub fn create_interpolated_clip(client: &dyn InferenceClient, job: &ClipJob) -> Result<Vec<ClipOutput>> {
    match job.settings.animation_style {
        AnimationStyle::CreativeInterpolation => {
            let settings = job.settings;
            let expanded = ForwardTransform::new(job.params.buffer)
                .with_context_length(settings.context_length)
                .apply(job.params, job.params.frame_count())
                .context("Invalid motion settings")?;
            let request = InterpolationRequest::interpolation(
                &settings.backend,
                &expanded,
                job.image_uuids,
                settings.queue_inference,
            )?;

            info!(
                "Dispatching {} interpolation variant(s) for {} key frames",
                settings.variant_count,
                job.image_uuids.len()
            );
            (0..settings.variant_count)
                .map(|_| client.predict(&request).map(ClipOutput::Inference))
                .collect()
        }
        AnimationStyle::DirectMorphing => {
            let [first, second, ..] = job.image_paths else {
                bail!("Could not read one or both of the images.");
            };
            let img1 = image::open(first)
                .with_context(|| format!("Could not read image: {}", first.display()))?;
            let img2 = image::open(second)
                .with_context(|| format!("Could not read image: {}", second.display()))?;
            let frames = morph_frames(&img1, &img2, job.interpolation_steps as usize)?;
            Ok(vec![ClipOutput::Frames(frames)])
        }
    }
}

/// Cross-fade with alpha spaced evenly over `0..=1`: frame k is
/// `alpha * img1 + (1 - alpha) * img2`, so the sequence runs from `img2` to `img1`.
pub fn morph_frames(img1: &DynamicImage, img2: &DynamicImage, num_frames: usize) -> Result<Vec<RgbaImage>> {
    let a = img1.to_rgba8();
    let b = img2.to_rgba8();
    if a.dimensions() != b.dimensions() {
        bail!(
            "Image sizes differ: {:?} vs {:?}",
            a.dimensions(),
            b.dimensions()
        );
    }

    let (width, height) = a.dimensions();
    let frames = (0..num_frames)
        .map(|k| {
            let alpha = if num_frames > 1 {
                k as f32 / (num_frames - 1) as f32
            } else {
                0.0
            };
            let mut out = RgbaImage::new(width, height);
            for ((dst, pa), pb) in out.pixels_mut().zip(a.pixels()).zip(b.pixels()) {
                for c in 0..4 {
                    let v = alpha * pa[c] as f32 + (1.0 - alpha) * pb[c] as f32;
                    dst[c] = v.round().clamp(0.0, 255.0) as u8;
                }
            }
            out
        })
        .collect::<Vec<_>>();

    debug!("Morphed {} frames at {}x{}", frames.len(), width, height);
    Ok(frames)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::motion::MotionContext;
    use image::Rgba;
    use std::cell::{Cell, RefCell};

    #[derive(Default)]
    struct CountingClient {
        calls: Cell<usize>,
        motion_scales: RefCell<Vec<Value>>,
    }

    impl InferenceClient for CountingClient {
        fn predict(&self, request: &InterpolationRequest) -> Result<InferenceOutcome> {
            self.calls.set(self.calls.get() + 1);
            assert_eq!(request.model, AD_INTERPOLATION_MODEL);
            self.motion_scales.borrow_mut().push(request.data["motion_scales"].clone());
            Ok(InferenceOutcome::Queued {
                job_id: format!("job-{}", self.calls.get()),
            })
        }
    }

    fn params() -> SimpleMotionParams {
        SimpleMotionParams {
            strength_of_frames: vec![1.0, 0.8],
            freedom_between_frames: vec![0.2],
            speed_of_transitions: vec![0.5],
            distance_to_next_frames: vec![1.0],
            type_of_motion_context: MotionContext::Standard,
            strength_of_adherence: 0.5,
            individual_prompts: vec!["a".into(), "b".into()],
            individual_negative_prompts: vec![],
            motions_during_frames: vec![1.0, 1.0],
            buffer: 0,
        }
    }

    #[test]
    fn test_interpolation_steps() {
        assert_eq!(interpolation_steps(0.1), 2);
        assert_eq!(interpolation_steps(0.17), 3);
        assert_eq!(interpolation_steps(0.5), 4);
        assert_eq!(interpolation_steps(1.0), 5);
        assert_eq!(interpolation_steps(2.0), 6);
        assert_eq!(interpolation_steps(4.0), 7);
        assert_eq!(interpolation_steps(4.3), 8);
        assert_eq!(interpolation_steps(60.0), 8);
    }

    #[test]
    fn test_request_fields() {
        let settings = AppSettings::default();
        let expanded = ForwardTransform::new(4).apply(&params(), 2).unwrap();
        let images = [Uuid::new_v4(), Uuid::new_v4()];
        let request = InterpolationRequest::interpolation(&settings.backend, &expanded, &images, true).unwrap();

        assert_eq!(request.prompt, "SM");
        let data = &request.data;
        assert_eq!(data["context_stride"], Value::from(2));
        assert_eq!(data["multipled_base_end_percent"], Value::from(0.25));
        assert_eq!(data["motion_scales"], Value::from("4:(1.0)5:(1.0)"));
        assert_eq!(data["buffer"], Value::from(4));
        assert_eq!(data["max_frames"], Value::from(17));
        assert_eq!(data["queue_inference"], Value::from(true));
        assert_eq!(data["ckpt"], Value::from(""));
        assert_eq!(data["file_image_001_uuid"], Value::from(images[0].to_string()));
        assert_eq!(data["file_image_002_uuid"], Value::from(images[1].to_string()));
        assert!(data.get("file_image_003_uuid").is_none());

        // image keys come last
        let last_key = data.keys().last().unwrap();
        assert_eq!(last_key, "file_image_002_uuid");
    }

    #[test]
    fn test_variants_dispatched() {
        let mut settings = AppSettings::default();
        settings.variant_count = 3;
        let client = CountingClient::default();
        let images = [Uuid::new_v4(), Uuid::new_v4()];
        let p = params();
        let job = ClipJob {
            params: &p,
            settings: &settings,
            image_uuids: &images,
            image_paths: &[],
            interpolation_steps: 0,
        };

        let outputs = create_interpolated_clip(&client, &job).unwrap();
        assert_eq!(outputs.len(), 3);
        assert_eq!(client.calls.get(), 3);
        assert!(matches!(
            &outputs[2],
            ClipOutput::Inference(InferenceOutcome::Queued { job_id }) if job_id == "job-3"
        ));
    }

    #[test]
    fn test_dispatch_uses_params_buffer() {
        let settings = AppSettings::default();
        assert_eq!(settings.buffer, 4);
        let client = CountingClient::default();
        let images = [Uuid::new_v4(), Uuid::new_v4()];
        let mut p = params();
        p.buffer = 8;
        let job = ClipJob {
            params: &p,
            settings: &settings,
            image_uuids: &images,
            image_paths: &[],
            interpolation_steps: 0,
        };

        create_interpolated_clip(&client, &job).unwrap();
        let direct = ForwardTransform::new(p.buffer).apply(&p, 2).unwrap();
        assert_eq!(direct.motion_scales, "8:(1.0)9:(1.0)");
        assert_eq!(client.motion_scales.borrow()[0], Value::from(direct.motion_scales));
    }

    #[test]
    fn test_invalid_params_not_dispatched() {
        let settings = AppSettings::default();
        let client = CountingClient::default();
        let mut p = params();
        p.speed_of_transitions.clear();
        let job = ClipJob {
            params: &p,
            settings: &settings,
            image_uuids: &[],
            image_paths: &[],
            interpolation_steps: 0,
        };
        assert!(create_interpolated_clip(&client, &job).is_err());
        assert_eq!(client.calls.get(), 0);
    }

    #[test]
    fn test_morph_frames() {
        let white = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([255, 255, 255, 255])));
        let black = DynamicImage::ImageRgba8(RgbaImage::from_pixel(2, 2, Rgba([0, 0, 0, 255])));

        let frames = morph_frames(&white, &black, 3).unwrap();
        assert_eq!(frames.len(), 3);
        assert_eq!(frames[0].get_pixel(0, 0), &Rgba([0, 0, 0, 255]));
        assert_eq!(frames[1].get_pixel(1, 1), &Rgba([128, 128, 128, 255]));
        assert_eq!(frames[2].get_pixel(0, 1), &Rgba([255, 255, 255, 255]));

        let small = DynamicImage::ImageRgba8(RgbaImage::new(1, 1));
        assert!(morph_frames(&white, &small, 2).is_err());
    }

    #[test]
    fn test_direct_morph_needs_two_images() {
        let mut settings = AppSettings::default();
        settings.animation_style = AnimationStyle::DirectMorphing;
        let client = CountingClient::default();
        let p = params();
        let paths = [PathBuf::from("only_one.png")];
        let job = ClipJob {
            params: &p,
            settings: &settings,
            image_uuids: &[],
            image_paths: &paths,
            interpolation_steps: 4,
        };
        let err = create_interpolated_clip(&client, &job).unwrap_err();
        assert!(err.to_string().contains("one or both"));
    }

    #[test]
    fn test_direct_morph_from_files() {
        let dir = std::env::temp_dir().join(format!("frameweave_morph_{}", Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        let a = dir.join("a.png");
        let b = dir.join("b.png");
        RgbaImage::from_pixel(4, 4, Rgba([200, 0, 0, 255])).save(&a).unwrap();
        RgbaImage::from_pixel(4, 4, Rgba([0, 0, 200, 255])).save(&b).unwrap();

        let mut settings = AppSettings::default();
        settings.animation_style = AnimationStyle::DirectMorphing;
        let client = CountingClient::default();
        let p = params();
        let paths = [a, b];
        let job = ClipJob {
            params: &p,
            settings: &settings,
            image_uuids: &[],
            image_paths: &paths,
            interpolation_steps: 5,
        };

        let outputs = create_interpolated_clip(&client, &job).unwrap();
        match &outputs[..] {
            [ClipOutput::Frames(frames)] => {
                assert_eq!(frames.len(), 5);
                assert_eq!(frames[4].get_pixel(0, 0), &Rgba([200, 0, 0, 255]));
            }
            other => panic!("unexpected outputs: {:?}", other),
        }
        assert_eq!(client.calls.get(), 0);

        let _ = std::fs::remove_dir_all(&dir);
    }
}
