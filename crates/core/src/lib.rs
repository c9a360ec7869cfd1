pub mod catalog;
pub mod config;
pub mod fetcher;
pub mod finalize;
pub mod job;
pub mod manager;
pub mod metrics;
pub mod pool;
pub mod proxy;
pub mod testing;
pub mod track;

pub use catalog::{
    parse_link, CatalogConfig, CatalogError, ContentType, MetadataResolver, ResolvedCollection,
    SpotifyResolver,
};
pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
};
pub use fetcher::{FetchError, FetchRequest, Fetcher, FetcherConfig, YtDlpFetcher};
pub use finalize::{FinalizeOutcome, Finalizer};
pub use job::{JobState, JobStatus, JobStore, JobToken, ProcessRegistry, Subscription};
pub use manager::{JobError, JobManager, JobRequest};
pub use pool::{PoolConfig, RetryConfig, RetryPolicy, WorkerPool};
pub use proxy::{ProxyCursor, ProxyList};
pub use track::{sanitize, AudioFormat, NamingPattern, TrackRequest};
