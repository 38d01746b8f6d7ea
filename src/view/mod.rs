//! Viewport rendering: the windowed list for results and the chunked
//! document renderer for previews.
pub mod chunked;
pub mod frame;
pub mod lines;
pub mod surface;
pub mod virtualizer;

pub use chunked::{ChunkedContentRenderer, RenderOptions, RenderOutcome, RenderRequest};
pub use frame::FrameThrottle;
pub use lines::{LazyLineParser, LineSource};
pub use surface::{
    DocumentSurface, FailurePanel, MemoryDocument, RenderChunk, ScrollSurface, SurfaceEvent,
    PREVIEW_UNAVAILABLE,
};
pub use virtualizer::{
    Filterable, ListViewport, RenderMode, VirtualWindow, Virtualizer, VirtualizerOptions,
};
