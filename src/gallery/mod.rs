//! Gallery and preview rendering

pub mod view;

pub use view::{CaptureControl, GalleryCell, ModeButton, PreviewOverlay, WidgetView};
