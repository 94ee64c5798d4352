//! The seam between the OCR runner and a model backend.
//!
//! The runner only needs two things from a backend: a way to load it once
//! from the model directory ([`ModelLoader`]) and one inference entry point
//! that reads an image file and leaves its transcription in
//! `<output_path>/result.mmd` ([`OcrModel::infer`]).
//!
//! The loaded model is held by a [`ModelSession`] for exactly one runner
//! call. Dropping the session releases the model, so teardown happens on
//! every exit path, including fatal errors after the model was loaded.

use crate::config::ModeParams;
use crate::error::{InferenceError, SwanOcrError};
use std::future::Future;
use std::path::Path;
use tracing::debug;

/// Arguments of one inference call.
#[derive(Debug, Clone, Copy)]
pub struct InferRequest<'a> {
    /// Resolved prompt, including the `<image>` placeholder if any.
    pub prompt: &'a str,
    /// Image file to transcribe.
    pub image_file: &'a Path,
    /// Directory receiving `result.mmd` and figure crops.
    pub output_path: &'a Path,
    /// Preprocessing triple of the selected mode.
    pub params: ModeParams,
    /// Write the transcription to `result.mmd`.
    pub save_results: bool,
    /// Log vision-token versus text-token compression statistics.
    pub test_compress: bool,
}

/// A loaded OCR model.
pub trait OcrModel: Send + Sync {
    /// Transcribe one image.
    ///
    /// Returning `Ok(())` does not guarantee a result file; the runner
    /// treats a missing `result.mmd` as a failed page.
    fn infer(
        &self,
        request: &InferRequest<'_>,
    ) -> impl Future<Output = Result<(), InferenceError>> + Send;

    /// Free model resources. Called exactly once, when the session ends.
    fn release(&mut self) {}
}

/// Loads an [`OcrModel`] from its directory.
pub trait ModelLoader {
    type Model: OcrModel;

    /// Load tokenizer and weights. `model_dir` is known to exist.
    fn load(&self, model_dir: &Path) -> Result<Self::Model, SwanOcrError>;
}

/// Scoped ownership of a loaded model for one runner call.
pub struct ModelSession<M: OcrModel> {
    model: M,
}

impl<M: OcrModel> ModelSession<M> {
    /// Load the model through `loader` and open a session around it.
    pub fn open<L>(loader: &L, model_dir: &Path) -> Result<Self, SwanOcrError>
    where
        L: ModelLoader<Model = M>,
    {
        let model = loader.load(model_dir)?;
        Ok(Self { model })
    }

    pub fn model(&self) -> &M {
        &self.model
    }
}

impl<M: OcrModel> Drop for ModelSession<M> {
    fn drop(&mut self) {
        self.model.release();
        debug!("OCR model released");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    struct Counting(Arc<AtomicUsize>);

    impl OcrModel for Counting {
        async fn infer(&self, _request: &InferRequest<'_>) -> Result<(), InferenceError> {
            Ok(())
        }

        fn release(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    struct Loader(Arc<AtomicUsize>);

    impl ModelLoader for Loader {
        type Model = Counting;

        fn load(&self, _model_dir: &Path) -> Result<Counting, SwanOcrError> {
            Ok(Counting(Arc::clone(&self.0)))
        }
    }

    #[test]
    fn session_releases_once_on_drop() {
        let released = Arc::new(AtomicUsize::new(0));
        let session = ModelSession::open(&Loader(Arc::clone(&released)), Path::new("/m")).unwrap();
        assert_eq!(released.load(Ordering::SeqCst), 0);
        drop(session);
        assert_eq!(released.load(Ordering::SeqCst), 1);
    }
}
