//! Lip-sync chain
//!
//! Optional linear chain off the conversational pipeline: synthesized audio
//! → external renderer subprocess → blendshape extraction → HTTP push to a
//! render engine.

mod blendshapes;
mod renderer;
mod sink;

pub use blendshapes::{
    BLENDSHAPE_NAMES, BlendshapeExtractor, BlendshapeSet, HttpExtractor, is_recognized,
};
pub use renderer::{LipSyncRenderer, RenderOutcome, RenderRequest};
pub use sink::BlendshapeSink;
