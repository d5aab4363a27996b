//! Denoising session
//!
//! A `DenoisingSession` owns exactly one model and pushes caller PCM through
//! it: downmix, resample to the model input rate, normalize, infer,
//! denormalize, resample from the model output rate back to the caller rate.
//!
//! Every operation that touches the model runs under one mutex, held across the
//! whole pipeline. Inference, model swaps and resets therefore never overlap;
//! concurrent callers queue on the lock and run one after another.
//!
//! Lifecycle:
//! - `Ready`: a model is loaded
//! - `Vacant`: a model swap closed the old model but the new one failed to
//!   load; `reset` and non-empty `process` calls fail with `ModelUnavailable` until a later
//!   `change_model_type` succeeds
//! - `Closed`: terminal; every operation fails with `SessionClosed`

use std::sync::{Mutex, MutexGuard, PoisonError};

use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::audio::pcm::{bytes_to_normalized, normalized_to_bytes, BYTES_PER_SAMPLE};
use crate::audio::processing::{
    calculate_chunk_size, downmix_to_mono, resample_if_needed, upmix_from_mono,
};
use crate::config::DenoiseConfig;
use crate::error::{DenoiseError, Result};
use crate::neural::{
    expected_output_len, BundledLoader, DenoiseModel, ModelLoader, ModelType,
    MODEL_INPUT_SAMPLE_RATE, MODEL_OUTPUT_SAMPLE_RATE,
};

/// Granularity of the sizing API: callers feed whole seconds of audio
pub const MINIMUM_CHUNK_MILLIS: u64 = 1_000;

enum ModelSlot {
    Ready(Box<dyn DenoiseModel>),
    Vacant,
    Closed,
}

struct SessionState {
    slot: ModelSlot,
    model_type: Option<ModelType>,
}

impl SessionState {
    fn model_mut(&mut self) -> Result<&mut dyn DenoiseModel> {
        match &mut self.slot {
            ModelSlot::Ready(model) => Ok(model.as_mut()),
            ModelSlot::Vacant => Err(DenoiseError::ModelUnavailable),
            ModelSlot::Closed => Err(DenoiseError::SessionClosed),
        }
    }
}

/// Thread-safe denoising session around one swappable model
///
/// Share it between threads with `Arc<DenoisingSession>`.
pub struct DenoisingSession {
    id: Uuid,
    loader: Option<Box<dyn ModelLoader>>,
    state: Mutex<SessionState>,
}

fn into_load_error(model_type: ModelType, err: DenoiseError) -> DenoiseError {
    match err {
        err @ DenoiseError::ModelLoad { .. } => err,
        other => DenoiseError::ModelLoad {
            model: model_type.file_stem().to_string(),
            reason: other.to_string(),
            source: Some(Box::new(other)),
        },
    }
}

impl DenoisingSession {
    /// Create a session, loading `model_type` through `loader` right away
    ///
    /// # Errors
    /// * `ModelLoad` - the initial model could not be loaded
    pub fn new(loader: impl ModelLoader + 'static, model_type: ModelType) -> Result<Self> {
        let id = Uuid::new_v4();
        let model = loader
            .load(model_type)
            .map_err(|e| into_load_error(model_type, e))?;

        info!(session = %id, model = %model_type, backend = model.name(), "Session ready");

        Ok(Self {
            id,
            loader: Some(Box::new(loader)),
            state: Mutex::new(SessionState {
                slot: ModelSlot::Ready(model),
                model_type: Some(model_type),
            }),
        })
    }

    /// Create a session around a model the caller already loaded
    ///
    /// Such a session has no loader and no descriptor, so
    /// `change_model_type` always fails with `ModelLoad`.
    pub fn with_model(model: Box<dyn DenoiseModel>) -> Self {
        let id = Uuid::new_v4();
        info!(session = %id, backend = model.name(), "Session ready with supplied model");

        Self {
            id,
            loader: None,
            state: Mutex::new(SessionState {
                slot: ModelSlot::Ready(model),
                model_type: None,
            }),
        }
    }

    /// Create a session with the bundled backend and the configured model type
    pub fn from_config(config: &DenoiseConfig) -> Result<Self> {
        config.validate()?;
        Self::new(BundledLoader, config.model_type)
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    /// Bytes of PCM covering one `MINIMUM_CHUNK_MILLIS` block
    pub fn minimum_input_size(sample_rate: u32, channels: u16) -> Result<usize> {
        calculate_chunk_size(sample_rate, channels, MINIMUM_CHUNK_MILLIS)
    }

    /// Bytes of PCM covering `millis`, rounded up to whole minimum blocks
    pub fn input_size_for_millis(sample_rate: u32, channels: u16, millis: u64) -> Result<usize> {
        let minimum = Self::minimum_input_size(sample_rate, channels)?;
        usize::try_from(millis.div_ceil(MINIMUM_CHUNK_MILLIS))
            .ok()
            .and_then(|factor| factor.checked_mul(minimum))
            .ok_or_else(|| {
                DenoiseError::invalid_argument(format!(
                    "{} ms of audio at {} Hz x {} channels does not fit in a byte count",
                    millis, sample_rate, channels
                ))
            })
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        // A panic inside a model leaves the slot itself intact
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Denoise interleaved 16-bit PCM at `sample_rate`
    ///
    /// The output has the caller's sample rate and channel count. Empty input
    /// yields empty output.
    ///
    /// # Errors
    /// * `InvalidArgument` - zero rate or channels, or a partial trailing frame
    /// * `Inference` - the model failed or broke its output length contract
    /// * `ModelUnavailable` - a previous model change left no model
    /// * `SessionClosed` - the session was closed
    pub fn process(&self, pcm: &[u8], sample_rate: u32, channels: u16) -> Result<Vec<u8>> {
        if sample_rate == 0 {
            return Err(DenoiseError::invalid_argument(
                "Sample rate must be greater than 0",
            ));
        }
        if channels == 0 {
            return Err(DenoiseError::invalid_argument(
                "Channel count must be at least 1",
            ));
        }
        if pcm.len() % (channels as usize * BYTES_PER_SAMPLE) != 0 {
            return Err(DenoiseError::invalid_argument(
                "PCM byte size must be a multiple of the frame size (channels * 2)",
            ));
        }

        let mut state = self.lock();
        if matches!(state.slot, ModelSlot::Closed) {
            return Err(DenoiseError::SessionClosed);
        }
        if pcm.is_empty() {
            return Ok(Vec::new());
        }
        let model = state.model_mut()?;

        let mono = downmix_to_mono(pcm, channels)?;
        let model_input = resample_if_needed(&mono, 1, sample_rate, MODEL_INPUT_SAMPLE_RATE)?;
        if model_input.is_empty() {
            // shorter than one frame at the model rate
            return Ok(Vec::new());
        }

        let samples = bytes_to_normalized(&model_input);
        let denoised = model.process(&samples)?;

        let expected = expected_output_len(samples.len());
        if denoised.len() != expected {
            return Err(DenoiseError::inference(format!(
                "{} returned {} samples, expected {}",
                model.name(),
                denoised.len(),
                expected
            )));
        }

        let model_output = normalized_to_bytes(&denoised);
        let restored = resample_if_needed(&model_output, 1, MODEL_OUTPUT_SAMPLE_RATE, sample_rate)?;
        let output = upmix_from_mono(&restored, channels)?.into_owned();

        debug!(
            session = %self.id,
            input_bytes = pcm.len(),
            output_bytes = output.len(),
            sample_rate,
            channels,
            "Processed chunk"
        );

        Ok(output)
    }

    /// Clear the model's recurrent state
    pub fn reset(&self) -> Result<()> {
        let mut state = self.lock();
        state.model_mut()?.reset()?;
        debug!(session = %self.id, "Model state reset");
        Ok(())
    }

    /// Replace the loaded model with one of `model_type`
    ///
    /// Does nothing when that type is already loaded. Otherwise the current
    /// model is closed before the new one is loaded. If loading fails, the
    /// session is left without a model (`ModelUnavailable`) until a later call
    /// succeeds; there is no automatic fallback to the previous type.
    ///
    /// # Errors
    /// * `ModelLoad` - the new model could not be loaded, or the session has no loader
    /// * `SessionClosed` - the session was closed
    pub fn change_model_type(&self, model_type: ModelType) -> Result<()> {
        let mut state = self.lock();

        match &state.slot {
            ModelSlot::Closed => return Err(DenoiseError::SessionClosed),
            ModelSlot::Ready(_) if state.model_type == Some(model_type) => return Ok(()),
            _ => {}
        }

        let loader = self.loader.as_ref().ok_or_else(|| {
            DenoiseError::model_load(
                model_type.file_stem(),
                "session was created with a supplied model and cannot load others",
            )
        })?;

        if let ModelSlot::Ready(mut old) = std::mem::replace(&mut state.slot, ModelSlot::Vacant) {
            old.close();
        }
        let previous = state.model_type.take();

        match loader.load(model_type) {
            Ok(model) => {
                info!(
                    session = %self.id,
                    from = ?previous,
                    to = %model_type,
                    backend = model.name(),
                    "Model changed"
                );
                state.slot = ModelSlot::Ready(model);
                state.model_type = Some(model_type);
                Ok(())
            }
            Err(e) => {
                warn!(
                    session = %self.id,
                    model = %model_type,
                    error = %e,
                    "Model load failed, session has no model"
                );
                Err(into_load_error(model_type, e))
            }
        }
    }

    /// Descriptor of the loaded model
    ///
    /// `None` for sessions built around a supplied model, or after a failed
    /// model change.
    pub fn model_type(&self) -> Result<Option<ModelType>> {
        let state = self.lock();
        match state.slot {
            ModelSlot::Closed => Err(DenoiseError::SessionClosed),
            _ => Ok(state.model_type),
        }
    }

    pub fn is_closed(&self) -> bool {
        matches!(self.lock().slot, ModelSlot::Closed)
    }

    /// Reset and release the model. Idempotent; never fails.
    pub fn close(&self) {
        let mut state = self.lock();

        if let ModelSlot::Ready(mut model) = std::mem::replace(&mut state.slot, ModelSlot::Closed)
        {
            if let Err(e) = model.reset() {
                warn!(session = %self.id, error = %e, "Reset before close failed");
            }
            model.close();
            info!(session = %self.id, "Session closed");
        }
        state.model_type = None;
    }
}

impl Drop for DenoisingSession {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::pcm::{bytes_to_samples, samples_to_bytes};
    use crate::neural::mock::{CallJournal, MockLoader, MockModel};
    use crate::neural::{FnLoader, PassthroughModel};
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn mock_session() -> (DenoisingSession, Arc<MockLoader>) {
        let loader = Arc::new(MockLoader::new(CallJournal::new()));
        let session = DenoisingSession::new(Arc::clone(&loader), ModelType::SmallFast).unwrap();
        (session, loader)
    }

    // === Sizing ===

    #[test]
    fn test_minimum_input_size() {
        assert_eq!(DenoisingSession::minimum_input_size(16000, 1).unwrap(), 32000);
        assert_eq!(DenoisingSession::minimum_input_size(48000, 2).unwrap(), 192000);
    }

    #[test]
    fn test_input_size_rounds_up_to_whole_blocks() {
        let minimum = DenoisingSession::minimum_input_size(44100, 2).unwrap();

        assert_eq!(
            DenoisingSession::input_size_for_millis(44100, 2, 2500).unwrap(),
            3 * minimum
        );
        assert_eq!(
            DenoisingSession::input_size_for_millis(44100, 2, 1000).unwrap(),
            minimum
        );
        assert_eq!(DenoisingSession::input_size_for_millis(44100, 2, 0).unwrap(), 0);
    }

    #[test]
    fn test_input_size_overflow_is_an_error() {
        let err = DenoisingSession::input_size_for_millis(48000, 2, u64::MAX).unwrap_err();
        assert!(matches!(err, DenoiseError::InvalidArgument { .. }));

        // each factor fits, their product does not
        let err = DenoisingSession::input_size_for_millis(48000, 2, u64::MAX / 1000 * 999);
        assert!(err.is_err());
    }

    #[test]
    fn test_sizing_rejects_zero_rate() {
        assert!(DenoisingSession::minimum_input_size(0, 1).is_err());
        assert!(DenoisingSession::input_size_for_millis(16000, 0, 100).is_err());
    }

    // === Process ===

    #[test]
    fn test_silence_round_trip() {
        let (session, _) = mock_session();
        let silence = vec![0u8; 960_000];

        let output = session.process(&silence, 48000, 1).unwrap();

        assert_eq!(output.len(), silence.len());
        assert!(output.iter().all(|&b| b == 0));
    }

    #[test]
    fn test_stereo_output_keeps_layout() {
        let session = DenoisingSession::with_model(Box::new(PassthroughModel::new()));
        let frames: Vec<i16> = (0..2400).flat_map(|i| [i as i16, i as i16]).collect();

        let output = session.process(&samples_to_bytes(&frames), 24000, 2).unwrap();
        let samples = bytes_to_samples(&output);

        // 24k in, 48k out of the model, back to 24k
        assert_eq!(samples.len(), frames.len());
        assert!(samples.chunks_exact(2).all(|f| f[0] == f[1]));
    }

    #[test]
    fn test_empty_input_fast_path() {
        let (session, loader) = mock_session();
        assert!(session.process(&[], 16000, 1).unwrap().is_empty());
        assert_eq!(loader.produced()[0].processed(), 0);
    }

    #[test]
    fn test_invalid_arguments_fail_before_model() {
        let (session, loader) = mock_session();

        for (pcm, rate, channels) in [
            (vec![0u8; 4], 0u32, 1u16),
            (vec![0u8; 4], 16000, 0),
            (vec![0u8; 6], 16000, 2),
        ] {
            let err = session.process(&pcm, rate, channels).unwrap_err();
            assert!(matches!(err, DenoiseError::InvalidArgument { .. }));
        }
        assert_eq!(loader.produced()[0].processed(), 0);
    }

    #[test]
    fn test_model_error_surfaces_unchanged() {
        let session = DenoisingSession::with_model(Box::new(MockModel::new("broken").failing_process()));

        match session.process(&[0u8; 96], 24000, 1).unwrap_err() {
            DenoiseError::Inference { reason, .. } => assert!(reason.contains("broken")),
            other => panic!("Expected Inference error, got: {:?}", other),
        }
        // session stays usable
        assert!(!session.is_closed());
    }

    #[test]
    fn test_output_length_contract_enforced() {
        let session = DenoisingSession::with_model(Box::new(MockModel::new("short").with_output_len(3)));

        let err = session.process(&[0u8; 96], 24000, 1).unwrap_err();
        assert!(matches!(err, DenoiseError::Inference { .. }));
    }

    // === Model changes ===

    #[test]
    fn test_change_model_type_swaps_and_closes_old() {
        let (session, loader) = mock_session();

        session.change_model_type(ModelType::LargeFast).unwrap();

        assert_eq!(session.model_type().unwrap(), Some(ModelType::LargeFast));
        let produced = loader.produced();
        assert_eq!(produced.len(), 2);
        assert_eq!(produced[0].closes(), 1);
        assert_eq!(produced[1].closes(), 0);
    }

    #[test]
    fn test_change_to_same_type_is_noop() {
        let (session, loader) = mock_session();

        session.change_model_type(ModelType::SmallFast).unwrap();

        assert_eq!(loader.loads(), 1);
        assert_eq!(loader.produced()[0].closes(), 0);
    }

    #[test]
    fn test_failed_change_leaves_session_without_model() {
        let loader = Arc::new(MockLoader::new(CallJournal::new()).failing_for(ModelType::LargeFast));
        let session = DenoisingSession::new(Arc::clone(&loader), ModelType::SmallFast).unwrap();

        let err = session.change_model_type(ModelType::LargeFast).unwrap_err();
        assert!(matches!(err, DenoiseError::ModelLoad { .. }));
        assert_eq!(loader.produced()[0].closes(), 1);

        assert_eq!(session.model_type().unwrap(), None);
        assert!(matches!(
            session.process(&[0u8; 4], 24000, 1).unwrap_err(),
            DenoiseError::ModelUnavailable
        ));
        assert!(matches!(session.reset().unwrap_err(), DenoiseError::ModelUnavailable));
        // empty input needs no model
        assert!(session.process(&[], 24000, 1).unwrap().is_empty());

        // a later successful change recovers, even back to the old type
        session.change_model_type(ModelType::SmallFast).unwrap();
        assert_eq!(session.model_type().unwrap(), Some(ModelType::SmallFast));
        assert!(session.process(&[0u8; 4], 24000, 1).is_ok());
    }

    #[test]
    fn test_loader_errors_become_load_errors() {
        let loader = FnLoader(|_: ModelType| -> Result<Box<dyn DenoiseModel>> {
            Err(DenoiseError::Io(std::io::Error::new(
                std::io::ErrorKind::PermissionDenied,
                "weights unreadable",
            )))
        });

        match DenoisingSession::new(loader, ModelType::SmallSlow) {
            Err(DenoiseError::ModelLoad { model, .. }) => {
                assert_eq!(model, "silero_denoise_small_slow")
            }
            Err(other) => panic!("Expected ModelLoad error, got: {:?}", other),
            Ok(_) => panic!("Expected ModelLoad error, got a session"),
        }
    }

    #[test]
    fn test_supplied_model_cannot_change_type() {
        let session = DenoisingSession::with_model(Box::new(PassthroughModel::new()));

        assert_eq!(session.model_type().unwrap(), None);
        assert!(matches!(
            session.change_model_type(ModelType::LargeFast).unwrap_err(),
            DenoiseError::ModelLoad { .. }
        ));
        // the supplied model is untouched
        assert!(session.process(&[0u8; 4], 24000, 1).is_ok());
    }

    // === Reset and close ===

    #[test]
    fn test_reset_delegates_to_model() {
        let model = MockModel::new("resettable");
        let stats = model.stats();
        let session = DenoisingSession::with_model(Box::new(model));

        session.reset().unwrap();
        assert_eq!(stats.resets(), 1);
    }

    #[test]
    fn test_close_resets_then_releases_once() {
        let model = MockModel::new("closing").failing_reset();
        let stats = model.stats();
        let session = DenoisingSession::with_model(Box::new(model));

        session.close();
        session.close();

        assert!(session.is_closed());
        assert_eq!(stats.resets(), 1);
        assert_eq!(stats.closes(), 1);
    }

    #[test]
    fn test_operations_after_close_fail() {
        let (session, _) = mock_session();
        session.close();

        assert!(matches!(
            session.process(&[0u8; 4], 16000, 1).unwrap_err(),
            DenoiseError::SessionClosed
        ));
        assert!(matches!(
            session.process(&[], 16000, 1).unwrap_err(),
            DenoiseError::SessionClosed
        ));
        assert!(matches!(session.reset().unwrap_err(), DenoiseError::SessionClosed));
        assert!(matches!(
            session.change_model_type(ModelType::LargeFast).unwrap_err(),
            DenoiseError::SessionClosed
        ));
        assert!(matches!(session.model_type().unwrap_err(), DenoiseError::SessionClosed));
    }

    #[test]
    fn test_drop_closes_model() {
        let model = MockModel::new("dropped");
        let stats = model.stats();

        drop(DenoisingSession::with_model(Box::new(model)));

        assert_eq!(stats.closes(), 1);
    }
}
