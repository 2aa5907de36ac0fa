pub mod commands;
pub mod hosting;
pub mod publisher;
pub mod target;

pub use commands::{CommitOutcome, GitCommandResult, GitRunner, interpret_commit};
pub use hosting::{ApiAuth, ApiResponse, CreateRepoRequest, HostingApi, UreqHostingApi};
pub use publisher::{GitPublishOutcome, GitPublisher, PublishRequest, PublishStatus};
pub use target::{AuthenticatedUrl, GitTarget, build_authenticated_url, build_remote_url};
