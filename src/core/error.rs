//! Exposes the deimos error type

use ash;
use thiserror::Error;

/// Error type that deimos can return.
#[derive(Error, Debug)]
pub enum Error {
    /// Generic Vulkan error type.
    #[error("Vulkan error: `{0}`")]
    VkError(ash::vk::Result),
    /// Tried to allocate a descriptor set from a layout without bindings.
    #[error("Empty descriptor set.")]
    EmptyDescriptorBinding,
    /// The same binding index was declared more than once in a single layout.
    #[error("Binding index `{0}` is declared more than once in the same descriptor set layout.")]
    DuplicateBinding(u32),
    /// A binding declares immutable samplers, but their number does not match its descriptor count.
    #[error("Binding `{0}` must have either no immutable samplers or exactly one per descriptor.")]
    ImmutableSamplerCountMismatch(u32),
    /// The driver reported success for a descriptor set allocation, but returned no set.
    #[error("Descriptor set allocation returned no descriptor set.")]
    NoDescriptorSetAllocated,
    /// The pool allocator owning this descriptor set was already destroyed.
    #[error("The descriptor pool allocator owning this descriptor set was destroyed.")]
    AllocatorDestroyed,
    /// Uncategorized error.
    #[error("Uncategorized error: `{0}`")]
    Uncategorized(&'static str),
}

impl From<ash::vk::Result> for Error {
    fn from(value: ash::vk::Result) -> Self {
        Error::VkError(value)
    }
}
