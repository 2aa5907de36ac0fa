#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum PublishStage {
    Store,
    Validate,
    Resolve,
    Copy,
    Identity,
    EnsureRepo,
    Init,
    Config,
    Add,
    Commit,
    Remote,
    Push,
    Rollback,
}

impl PublishStage {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Store => "store",
            Self::Validate => "validate",
            Self::Resolve => "resolve",
            Self::Copy => "copy",
            Self::Identity => "identity",
            Self::EnsureRepo => "ensure_repo",
            Self::Init => "init",
            Self::Config => "config",
            Self::Add => "add",
            Self::Commit => "commit",
            Self::Remote => "remote",
            Self::Push => "push",
            Self::Rollback => "rollback",
        }
    }
}

impl std::fmt::Display for PublishStage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
