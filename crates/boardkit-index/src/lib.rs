mod platform_index;

pub use platform_index::PlatformIndex;
