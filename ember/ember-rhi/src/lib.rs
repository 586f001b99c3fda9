//! Vulkan hardware layer for Ember.
//! Owns the instance, device, swapchain, and the frame-in-flight ring, and
//! provides the buffer/image/descriptor/pipeline helpers the renderer builds
//! its passes from. Every synchronization edge is an explicit barrier; there
//! is no hidden tracking.

pub mod buffer;
pub mod descriptor;
mod device;
mod frame;
pub mod image;
pub mod pipeline;
pub mod shader;

pub use descriptor::{DescriptorBuilder, DescriptorSet};
pub use device::Device;
pub use frame::{FrameData, RenderTarget, RenderView, FRAMES_IN_FLIGHT};

pub use ash::vk;
pub use gpu_allocator::MemoryLocation;
