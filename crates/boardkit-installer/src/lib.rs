mod artifact;
mod cancel;
mod download;
mod error;
mod fs_utils;
mod layout;
mod lock;
mod manager;
mod orchestrator;
mod post_install;
mod progress;
mod receipts;
mod types;
mod uninstall;

pub use cancel::CancellationToken;
pub use download::{DownloadManager, Downloader};
pub use error::{error_chain, InstallError};
pub use layout::{default_user_prefix, PrefixLayout};
pub use lock::InstallLock;
pub use manager::{PackageManager, PrefixPackageManager};
pub use orchestrator::{Orchestrator, UpgradeState, UpgradeTransaction};
pub use post_install::{
    detect_skip_post_install, is_interactive, PostInstallFlags, POST_INSTALL_SCRIPT,
};
pub use progress::{DownloadProgress, ProgressEvent, ProgressSender, TaskProgress};
pub use receipts::{
    current_unix_timestamp, read_platform_receipts, read_tool_receipts, write_install_receipt,
};
pub use types::{
    InstallOptions, InstallOutcome, InstallPhase, InstallReceipt, InstallRequest, InstallStatus,
    ReceiptKind, ToolFailurePolicy,
};
pub use uninstall::platform_uninstall;
