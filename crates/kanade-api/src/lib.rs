pub mod discogs;
pub mod error;
pub mod http;
pub mod itunes;
pub mod lastfm;
pub mod traits;

pub use error::ApiError;
pub use traits::{MetadataProvider, ProviderKind, ProviderMatch, TrackQuery};
