/// Errors raised by [`crate::ObjectStore`].
#[derive(Debug, thiserror::Error)]
pub enum ObjectStoreError {
    #[error("declared size {expected} does not match actual stream length {actual}")]
    SizeMismatch { expected: u64, actual: u64 },

    #[error("corrupt object {oid}: {reason}")]
    Corrupt { oid: String, reason: String },

    #[error(transparent)]
    Object(#[from] git_object::ObjectError),

    #[error(transparent)]
    Hash(#[from] git_hash::HashError),

    #[error(transparent)]
    Store(#[from] git_store::StoreError),

    #[error(transparent)]
    Temp(#[from] git_tempstore::TempStoreError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
