//! Network-facing half: classifying responses, decoding payloads and the
//! repository that ties both to the cache.

mod classify;
mod client;
mod connectivity;
mod decode;
mod notify;
mod outcome;
mod repository;
mod transport;

pub use classify::{classify, classify_and_notify};
pub use client::{raw_object, CachedApiClient};
pub use connectivity::{Connectivity, ConnectivityFlag};
pub use decode::{from_serde, parse_body, to_many, to_one, JsonMap, Unwrap};
pub use notify::{ChannelNotifier, LogNotifier, Notifier};
pub use outcome::{HttpResponse, RequestOutcome};
pub use repository::{FetchOptions, MutateOptions, Repository, DEFAULT_TTL_SECS};
pub use transport::HttpTransport;
