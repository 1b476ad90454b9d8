use super::codec;
use crate::runtime::{InferenceRuntime, Session, Tensor, TensorMap};
use crate::types::{ImageSize, Mask, PointPrompt, Result, SegmentError};
use image::RgbaImage;
use std::path::PathBuf;

/// Decoder mask-input side (the "no prior mask" placeholder).
const MASK_INPUT_SIZE: usize = 256;

/// Stateful orchestrator for the two-stage segmentation pipeline.
///
/// The vision encoder runs once per image (`set_image`) and its
/// embedding is cached; the prompt decoder runs once per click set
/// (`segment`) against that embedding. All methods are synchronous and
/// take `&mut self`, so overlapping calls on one provider cannot
/// interleave.
///
/// Lifecycle: `new` -> `initialize` -> `set_image` -> `segment`
/// (repeatable, and `set_image` may be called again to supersede the
/// cached embedding) -> `dispose`.
pub struct SegmentationProvider {
    runtime: Box<dyn InferenceRuntime>,
    encoder_path: PathBuf,
    decoder_path: PathBuf,

    encoder: Option<Box<dyn Session>>,
    decoder: Option<Box<dyn Session>>,

    // Set together by set_image, cleared together by dispose
    embedding: Option<Tensor>,
    current_size: Option<ImageSize>,
    resized_size: Option<ImageSize>,

    ready: bool,
}

impl SegmentationProvider {
    /// Create a provider over an injected inference runtime.
    ///
    /// No sessions are created until `initialize`.
    pub fn new(
        runtime: Box<dyn InferenceRuntime>,
        encoder_path: impl Into<PathBuf>,
        decoder_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            runtime,
            encoder_path: encoder_path.into(),
            decoder_path: decoder_path.into(),
            encoder: None,
            decoder: None,
            embedding: None,
            current_size: None,
            resized_size: None,
            ready: false,
        }
    }

    /// Create the encoder and decoder sessions.
    ///
    /// Calling again recreates both sessions. Session-creation errors
    /// propagate from the runtime and leave the provider not ready.
    pub fn initialize(&mut self) -> Result<()> {
        tracing::info!(
            "Initializing segmentation sessions (encoder: {}, decoder: {})",
            self.encoder_path.display(),
            self.decoder_path.display()
        );

        self.ready = false;
        self.encoder = Some(self.runtime.create_session(&self.encoder_path)?);
        self.decoder = Some(self.runtime.create_session(&self.decoder_path)?);
        self.ready = true;

        tracing::info!("Segmentation provider ready");
        Ok(())
    }

    /// Whether `initialize` has completed and `dispose` has not run.
    pub fn is_ready(&self) -> bool {
        self.ready
    }

    /// Whether an image embedding is cached and `segment` may be called.
    pub fn has_image(&self) -> bool {
        self.embedding.is_some()
    }

    /// Run the encoder over an image and cache its embedding.
    ///
    /// `rgba` is a row-major RGBA buffer of `size.width * size.height`
    /// pixels. Supersedes any previously cached embedding.
    pub fn set_image(&mut self, rgba: &[u8], size: ImageSize) -> Result<()> {
        if !self.ready {
            return Err(SegmentError::NotInitialized);
        }
        let encoder = self.encoder.as_mut().ok_or(SegmentError::NotInitialized)?;

        let _span = tracing::debug_span!("set_image", width = size.width, height = size.height)
            .entered();

        let (input, resized) = codec::preprocess(rgba, size);
        let outputs = encoder.run(&[("image", &input)])?;

        let embedding = select_embedding(outputs)?;
        tracing::debug!("Cached image embedding with dims {:?}", embedding.dims);

        self.embedding = Some(embedding);
        self.current_size = Some(size);
        self.resized_size = Some(resized);
        Ok(())
    }

    /// Convenience entry point for `image` crate buffers.
    pub fn set_image_rgba(&mut self, image: &RgbaImage) -> Result<()> {
        let size = ImageSize::new(image.width(), image.height());
        self.set_image(image.as_raw(), size)
    }

    /// Decode a mask from the cached embedding and the given clicks.
    ///
    /// Does not mutate the cached embedding; may be called repeatedly
    /// with different prompts against the same image.
    pub fn segment(&mut self, prompts: &[PointPrompt]) -> Result<Mask> {
        let (embedding, original, resized) = match (
            self.embedding.as_ref(),
            self.current_size,
            self.resized_size,
        ) {
            (Some(e), Some(o), Some(r)) => (e, o, r),
            _ => return Err(SegmentError::NoImageSet),
        };
        let decoder = self.decoder.as_mut().ok_or(SegmentError::NoImageSet)?;

        let _span = tracing::debug_span!("segment", prompts = prompts.len()).entered();

        let (coords, labels) = codec::point_tensors(prompts, original, resized);
        let mask_input = Tensor::zeros(vec![1, 1, MASK_INPUT_SIZE, MASK_INPUT_SIZE]);
        let has_mask_input = Tensor::new(vec![0.0], vec![1]);
        let orig_im_size = Tensor::new(
            vec![original.height as f32, original.width as f32],
            vec![2],
        );

        let outputs = decoder.run(&[
            ("image_embeddings", embedding),
            ("point_coords", &coords),
            ("point_labels", &labels),
            ("mask_input", &mask_input),
            ("has_mask_input", &has_mask_input),
            ("orig_im_size", &orig_im_size),
        ])?;

        let score = select_score(&outputs);
        let logits = select_mask_logits(&outputs)?;
        let logit_size = logit_grid_size(logits);

        let confidence = match score {
            Some(s) => {
                tracing::debug!("Using model score {:.3}", s);
                s.clamp(0.0, 1.0)
            }
            None => codec::confidence(&logits.data),
        };

        let data = codec::postprocess_mask(
            &logits.data[..logit_size.pixel_count()],
            logit_size,
            original,
            codec::MASK_THRESHOLD,
        );

        Ok(Mask {
            data,
            size: original,
            confidence,
        })
    }

    /// Release both sessions and clear all cached state.
    ///
    /// Idempotent; later calls are no-ops.
    pub fn dispose(&mut self) -> Result<()> {
        if let Some(mut encoder) = self.encoder.take() {
            encoder.release()?;
        }
        if let Some(mut decoder) = self.decoder.take() {
            decoder.release()?;
        }
        if self.ready || self.embedding.is_some() {
            tracing::info!("Segmentation provider disposed");
        }
        self.embedding = None;
        self.current_size = None;
        self.resized_size = None;
        self.ready = false;
        Ok(())
    }
}

/// Pick the embedding tensor out of the encoder response.
///
/// Exact key `image_embeddings` preferred, `output` as the legacy
/// fallback; anything else is an error rather than a silent guess.
fn select_embedding(mut outputs: TensorMap) -> Result<Tensor> {
    if let Some(t) = outputs.remove("image_embeddings") {
        return Ok(t);
    }
    if let Some(t) = outputs.remove("output") {
        return Ok(t);
    }
    Err(SegmentError::NoEmbeddingOutput)
}

/// Pick the mask-logit tensor out of the decoder response.
///
/// Exact `masks`/`mask` first so the common export names never depend
/// on map iteration order; otherwise a substring match must be unique.
fn select_mask_logits(outputs: &TensorMap) -> Result<&Tensor> {
    for key in ["masks", "mask"] {
        if let Some(t) = outputs.get(key) {
            return Ok(t);
        }
    }

    let mut matches: Vec<&String> = outputs
        .keys()
        .filter(|k| k.contains("mask"))
        .collect();
    matches.sort();

    match matches.as_slice() {
        [] => Err(SegmentError::NoMaskOutput),
        [key] => Ok(&outputs[key.as_str()]),
        many => Err(SegmentError::AmbiguousMaskOutput(
            many.iter().map(|k| k.to_string()).collect(),
        )),
    }
}

/// Optional model-reported score: first element of the first output
/// whose name contains "score" (sorted for determinism).
fn select_score(outputs: &TensorMap) -> Option<f64> {
    let mut keys: Vec<&String> = outputs.keys().filter(|k| k.contains("score")).collect();
    keys.sort();
    let tensor = outputs.get(keys.first()?.as_str())?;
    tensor.data.first().map(|&s| s as f64)
}

/// The trailing [H, W] of the logit tensor dims.
fn logit_grid_size(logits: &Tensor) -> ImageSize {
    let n = logits.dims.len();
    ImageSize::new(logits.dims[n - 1] as u32, logits.dims[n - 2] as u32)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::runtime::InferenceRuntime;
    use crate::types::PointPrompt;
    use anyhow::Result as AnyResult;
    use std::cell::RefCell;
    use std::path::Path;
    use std::rc::Rc;

    /// Script of output maps returned by successive fake sessions.
    #[derive(Default)]
    struct FakeLog {
        feeds: Vec<Vec<String>>,
        released: usize,
    }

    struct FakeSession {
        outputs: TensorMap,
        log: Rc<RefCell<FakeLog>>,
    }

    impl Session for FakeSession {
        fn run(&mut self, feeds: &[(&str, &Tensor)]) -> AnyResult<TensorMap> {
            self.log
                .borrow_mut()
                .feeds
                .push(feeds.iter().map(|(n, _)| n.to_string()).collect());
            Ok(self.outputs.clone())
        }

        fn release(&mut self) -> AnyResult<()> {
            self.log.borrow_mut().released += 1;
            Ok(())
        }
    }

    /// Returns the encoder outputs for the first created session and
    /// the decoder outputs for the second.
    struct FakeRuntime {
        scripts: RefCell<Vec<TensorMap>>,
        log: Rc<RefCell<FakeLog>>,
    }

    impl FakeRuntime {
        fn new(scripts: Vec<TensorMap>) -> Self {
            Self {
                scripts: RefCell::new(scripts),
                log: Rc::default(),
            }
        }
    }

    impl InferenceRuntime for FakeRuntime {
        fn create_session(&self, _model_path: &Path) -> AnyResult<Box<dyn Session>> {
            let outputs = self.scripts.borrow_mut().remove(0);
            Ok(Box::new(FakeSession {
                outputs,
                log: Rc::clone(&self.log),
            }))
        }
    }

    fn embedding_outputs(key: &str) -> TensorMap {
        let mut map = TensorMap::new();
        map.insert(key.to_string(), Tensor::zeros(vec![1, 256, 64, 64]));
        map
    }

    fn decoder_outputs(mask_key: &str, with_score: bool) -> TensorMap {
        let mut map = TensorMap::new();
        // 2x2 logit grid, top-left/bottom-right foreground
        map.insert(
            mask_key.to_string(),
            Tensor::new(vec![5.0, -5.0, -5.0, 5.0], vec![1, 1, 2, 2]),
        );
        if with_score {
            map.insert(
                "iou_scores".to_string(),
                Tensor::new(vec![0.875], vec![1, 1]),
            );
        }
        map
    }

    fn test_image(size: ImageSize) -> Vec<u8> {
        vec![128u8; size.pixel_count() * 4]
    }

    fn provider_with(scripts: Vec<TensorMap>) -> (SegmentationProvider, Rc<RefCell<FakeLog>>) {
        let runtime = FakeRuntime::new(scripts);
        let log = Rc::clone(&runtime.log);
        (
            SegmentationProvider::new(Box::new(runtime), "encoder.onnx", "decoder.onnx"),
            log,
        )
    }

    #[test]
    fn set_image_before_initialize_fails() {
        let (mut provider, _) = provider_with(vec![]);
        let size = ImageSize::new(4, 4);
        let err = provider.set_image(&test_image(size), size).unwrap_err();
        assert!(matches!(err, SegmentError::NotInitialized));
    }

    #[test]
    fn segment_before_set_image_fails() {
        let (mut provider, _) = provider_with(vec![
            embedding_outputs("image_embeddings"),
            decoder_outputs("masks", false),
        ]);
        provider.initialize().unwrap();
        let err = provider.segment(&[PointPrompt::positive(1.0, 1.0)]).unwrap_err();
        assert!(matches!(err, SegmentError::NoImageSet));
    }

    #[test]
    fn full_pipeline_produces_original_resolution_mask() {
        let (mut provider, log) = provider_with(vec![
            embedding_outputs("image_embeddings"),
            decoder_outputs("masks", true),
        ]);
        provider.initialize().unwrap();

        let size = ImageSize::new(4, 4);
        provider.set_image(&test_image(size), size).unwrap();
        assert!(provider.has_image());

        let mask = provider.segment(&[PointPrompt::positive(1.0, 1.0)]).unwrap();
        assert_eq!(mask.size, size);
        assert_eq!(mask.data.len(), 16);
        // 2x2 logits upsampled: top-left quadrant foreground
        assert_eq!(mask.data[0], 255);
        assert_eq!(mask.data[3], 0);
        // Model score used as confidence
        assert!((mask.confidence - 0.875).abs() < 1e-9);

        // Decoder feed set carries the full fixed contract
        let feeds = log.borrow().feeds.last().unwrap().clone();
        assert_eq!(
            feeds,
            vec![
                "image_embeddings",
                "point_coords",
                "point_labels",
                "mask_input",
                "has_mask_input",
                "orig_im_size",
            ]
        );
    }

    #[test]
    fn embedding_key_falls_back_to_output() {
        let (mut provider, _) = provider_with(vec![
            embedding_outputs("output"),
            decoder_outputs("masks", false),
        ]);
        provider.initialize().unwrap();
        let size = ImageSize::new(4, 4);
        provider.set_image(&test_image(size), size).unwrap();
        assert!(provider.has_image());
    }

    #[test]
    fn unrecognized_embedding_key_fails() {
        let (mut provider, _) = provider_with(vec![
            embedding_outputs("features"),
            decoder_outputs("masks", false),
        ]);
        provider.initialize().unwrap();
        let size = ImageSize::new(4, 4);
        let err = provider.set_image(&test_image(size), size).unwrap_err();
        assert!(matches!(err, SegmentError::NoEmbeddingOutput));
    }

    #[test]
    fn missing_mask_output_fails_loudly() {
        let mut decoder = TensorMap::new();
        decoder.insert(
            "segmentation".to_string(),
            Tensor::new(vec![0.0], vec![1, 1, 1, 1]),
        );
        let (mut provider, _) = provider_with(vec![
            embedding_outputs("image_embeddings"),
            decoder,
        ]);
        provider.initialize().unwrap();
        let size = ImageSize::new(2, 2);
        provider.set_image(&test_image(size), size).unwrap();

        let err = provider.segment(&[PointPrompt::positive(0.0, 0.0)]).unwrap_err();
        assert!(matches!(err, SegmentError::NoMaskOutput));
    }

    #[test]
    fn substring_mask_key_is_accepted_when_unique() {
        let (mut provider, _) = provider_with(vec![
            embedding_outputs("image_embeddings"),
            decoder_outputs("low_res_masks", false),
        ]);
        provider.initialize().unwrap();
        let size = ImageSize::new(2, 2);
        provider.set_image(&test_image(size), size).unwrap();
        let mask = provider.segment(&[PointPrompt::positive(0.0, 0.0)]).unwrap();
        // No score tensor: confidence falls back to the logit heuristic
        let expected = codec::confidence(&[5.0, -5.0, -5.0, 5.0]);
        assert!((mask.confidence - expected).abs() < 1e-9);
    }

    #[test]
    fn ambiguous_mask_keys_fail() {
        let mut decoder = decoder_outputs("low_res_masks", false);
        decoder.insert(
            "mask_quality".to_string(),
            Tensor::new(vec![0.0], vec![1, 1, 1, 1]),
        );
        let (mut provider, _) = provider_with(vec![
            embedding_outputs("image_embeddings"),
            decoder,
        ]);
        provider.initialize().unwrap();
        let size = ImageSize::new(2, 2);
        provider.set_image(&test_image(size), size).unwrap();

        let err = provider.segment(&[PointPrompt::positive(0.0, 0.0)]).unwrap_err();
        assert!(matches!(err, SegmentError::AmbiguousMaskOutput(_)));
    }

    #[test]
    fn dispose_is_idempotent_and_clears_state() {
        let (mut provider, log) = provider_with(vec![
            embedding_outputs("image_embeddings"),
            decoder_outputs("masks", false),
        ]);
        provider.initialize().unwrap();
        let size = ImageSize::new(2, 2);
        provider.set_image(&test_image(size), size).unwrap();

        provider.dispose().unwrap();
        assert!(!provider.is_ready());
        assert!(!provider.has_image());
        assert_eq!(log.borrow().released, 2);

        // Second dispose is a no-op
        provider.dispose().unwrap();
        assert_eq!(log.borrow().released, 2);

        let err = provider.set_image(&test_image(size), size).unwrap_err();
        assert!(matches!(err, SegmentError::NotInitialized));
    }
}
