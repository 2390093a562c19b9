use thiserror::Error;

#[derive(Debug, Error)]
pub enum NodeError {
    #[error("store error: {0}")]
    Store(#[from] powersnap_store::StoreError),

    #[error("lmdb error: {0}")]
    Lmdb(#[from] powersnap_store_lmdb::LmdbError),

    #[error("power error: {0}")]
    Power(#[from] powersnap_power::PowerError),

    #[error("config error: {0}")]
    Config(String),

    #[error("shutdown timeout")]
    ShutdownTimeout,
}
