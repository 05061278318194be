//! # launchkit-feed
//!
//! Package-feed clients behind the [`PackageRepository`] capability.
//!
//! - [`NuGetFeed`]: NuGet v3 HTTP feed (service index, search, flat container)
//! - [`LocalFeed`]: a folder of `<id>.<version>.nupkg` files
//! - [`FeedSet`]: ordered set of feeds built from launcher configuration

pub mod archive;
pub mod error;
pub mod local;
pub mod nuget;
pub mod repository;
pub mod sources;
pub mod version;

pub use error::FeedError;
pub use local::LocalFeed;
pub use nuget::NuGetFeed;
pub use repository::{Credentials, FeedSource, FoundPackage, PackageMetadata, PackageRepository};
pub use sources::FeedSet;
