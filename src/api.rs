//! Request/response envelope and the four sub-clients built on it.
//!
//! Every sub-client call goes through [`ApiClient::execute`], which pulls a fresh-or-cached token
//! from the shared [`CredentialStore`](crate::credential::CredentialStore), sends the request, and
//! maps non-success statuses onto [`ApiError`](crate::error::ApiError):
//!
//! | Status | [`ApiErrorKind`](crate::error::ApiErrorKind) |
//! |---|---|
//! | 400 | `Validation` |
//! | 401 | `Authentication` |
//! | 403 | `Forbidden` |
//! | 404 | `NotFound` |
//! | other 4xx | `Client` |
//! | 5xx | `Server` |
//! | no response | `Transport` (no status) |

pub mod control_plane;
pub mod crud;
pub mod factory;
pub mod files;
pub mod native;

mod client;
mod envelope;

pub use client::{ApiClient, ApiClientBuilder, RequestIdLookup};
pub use control_plane::ControlPlaneClient;
pub use crud::CrudClient;
pub use envelope::*;
pub use factory::{CachedClient, ClientCache, ClientFactory, ClientKind, SubClient};
pub use files::FilesClient;
pub use native::NativeClient;
