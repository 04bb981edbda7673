use lantern_core::LanternError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RendererError {
    #[error("no suitable GPU adapter: {0}")]
    Adapter(#[from] wgpu::RequestAdapterError),
    #[error("failed to open GPU device: {0}")]
    Device(#[from] wgpu::RequestDeviceError),
    #[error("failed to map readback buffer: {0}")]
    Readback(#[from] wgpu::BufferAsyncError),
    #[error("failed waiting for the GPU: {0}")]
    Poll(#[from] wgpu::PollError),
    #[error("readback callback was dropped before completing")]
    ReadbackDropped,
    #[error(transparent)]
    Lantern(#[from] LanternError),
}
