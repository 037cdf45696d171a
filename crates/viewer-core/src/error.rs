use crate::source::FetchError;
use docview_pdf_engine::PdfEngineError;

/// Why a document could not be loaded
#[derive(Debug, thiserror::Error)]
pub enum LoadFailure {
    #[error(transparent)]
    Fetch(#[from] FetchError),
    #[error(transparent)]
    Open(#[from] PdfEngineError),
}

#[derive(Debug, thiserror::Error)]
pub enum ViewerError {
    #[error("failed to load document {url}")]
    Load {
        url: String,
        #[source]
        source: LoadFailure,
    },
    #[error("no document loaded")]
    NoDocument,
    #[error("page render failed")]
    Render(#[from] PdfEngineError),
}

pub type ViewerResult<T> = Result<T, ViewerError>;
