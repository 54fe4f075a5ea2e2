use std::{
    fmt::{Debug, Display},
    future::Future,
    path::Path,
};

use crate::types::TranscriptResult;

/// Speech-to-text backend.
///
/// Constructed once at bootstrap and handed to the processor builder.
pub trait Transcriber {
    type Error: Debug + Display + Send + Sync + 'static;

    fn transcribe(
        &self,
        audio_path: &Path,
    ) -> impl Future<Output = Result<TranscriptResult, Self::Error>> + Send;
}

impl<T: Transcriber + Sync> Transcriber for &T {
    type Error = T::Error;

    fn transcribe(
        &self,
        audio_path: &Path,
    ) -> impl Future<Output = Result<TranscriptResult, Self::Error>> + Send {
        (**self).transcribe(audio_path)
    }
}
