//! Embeddable Cloud Foundry client session.
//!
//! A [`Session`] discovers a platform through `/v2/info`, authenticates
//! against UAA, keeps its tokens fresh, and exposes one manager per
//! resource type plus direct feature-flag calls.

pub mod api;
pub mod auth;
pub mod config;
pub mod error;
pub mod info;
pub mod logger;
pub mod managers;
pub mod random;
pub mod session;

pub use auth::{AuthManager, Credentials, TokenState};
pub use config::{Configuration, NoopPersistor, Persistor};
pub use error::{Error, Result};
pub use info::CcInfo;
pub use random::{new_random_string, new_uuid};
pub use session::{Session, SessionOptions};
