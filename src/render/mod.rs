pub mod assets;
pub mod canvas;
pub mod frame;
pub mod layers;
pub mod pixels;
pub mod postprocess;
#[cfg(test)]
pub mod recorder;
pub mod scheduler;
pub mod sprite;
pub mod surface;
