use std::path::PathBuf;

use flipbuf_core::{SurfaceError, SurfaceId};

/// Errors raised by the host simulation.
#[derive(Debug, thiserror::Error)]
pub enum SimError {
    /// The simulated panel cannot drive this resolution.
    #[error("unsupported resolution {width}x{height}")]
    UnsupportedResolution { width: u16, height: u16 },

    /// A flip was requested before any frame source was staged.
    #[error("flip requested with no frame source staged")]
    NoFrameSource,

    /// A transfer was started while another one was still in flight.
    #[error("block copy started while transfer {0} is still pending")]
    EngineBusy(u32),

    /// Surface buffers could not be wrapped.
    #[error("surface setup failed: {0:?}")]
    Surface(SurfaceError),

    /// `DisplayDriver::initialize` failed.
    #[error("display bring-up failed: {0}")]
    Init(String),

    /// A flush returned an error; the frame never reached the panel.
    #[error("frame {frame} dropped: {reason}")]
    FrameDropped { frame: u32, reason: String },

    /// After vertical blanking the panel scans out a different surface than
    /// the driver recorded as front.
    #[error("frame {frame}: panel shows {shown:?}, driver front is {front:?}")]
    ScanoutMismatch {
        frame: u32,
        shown: Option<SurfaceId>,
        front: SurfaceId,
    },

    /// The surfaces differ after a flushed frame.
    #[error("frame {frame}: surfaces diverged after reconciliation")]
    SurfacesDiverged { frame: u32 },

    /// A flush returned without signalling the renderer.
    #[error("frame {frame}: renderer was not signalled")]
    NotSignalled { frame: u32 },

    /// Failed to write the frame dump.
    #[error("image write error for {path}: {source}")]
    Image {
        path: PathBuf,
        source: image::ImageError,
    },
}

impl From<SurfaceError> for SimError {
    fn from(e: SurfaceError) -> Self {
        SimError::Surface(e)
    }
}
