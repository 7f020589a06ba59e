mod error;
mod resolve;
mod types;

pub use error::ResolveError;
pub use resolve::{find_platform_release_dependencies, select_release};
pub use types::{ReleaseSource, ResolvedPlatform};
