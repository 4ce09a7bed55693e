/// Errors raised while running garbage collection.
#[derive(Debug, thiserror::Error)]
pub enum GcError {
    #[error("gc is already running (pid {0}); pass force to override")]
    AlreadyRunning(String),

    #[error(transparent)]
    Repo(#[from] git_repository::RepoError),

    #[error(transparent)]
    RevWalk(#[from] git_revwalk::RevWalkError),

    #[error(transparent)]
    Odb(#[from] git_odb::OdbError),

    #[error(transparent)]
    Ref(#[from] git_ref::RefError),

    #[error(transparent)]
    Pack(#[from] git_pack::PackError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
