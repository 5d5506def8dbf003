//! Authorization conformance matrix for REST APIs: derive API-key, OAuth 2.0 token, scope, and
//! method probes from a declarative descriptor and grade the live API against them.
//!
//! The pipeline for one descriptor is:
//!
//! 1. [`descriptor::validate`] parses the raw JSON into an [`ApiDescriptor`], collecting every
//!    violation before any network call is issued.
//! 2. [`matrix::MatrixPlan`] derives the ordered probe specifications and the distinct scopes that
//!    need tokens.
//! 3. [`cache::TokenCache`] performs OIDC discovery once and acquires one client-credentials token
//!    per scope.
//! 4. [`probe::send`] executes each probe and [`report::classify`] grades the observed status.
//! 5. [`report::AssessmentResult`] folds the outcomes into the final verdict.
//!
//! [`assess::Assessor`] wires the steps together and repeats them for a batch.
//!
//! [`ApiDescriptor`]: descriptor::ApiDescriptor

#![deny(clippy::all, missing_docs, unused_crate_dependencies)]

pub mod assess;
pub mod auth;
pub mod cache;
pub mod descriptor;
pub mod error;
pub mod http;
pub mod matrix;
pub mod obs;
pub mod oidc;
pub mod probe;
pub mod report;

mod _prelude {
	pub use std::{
		collections::{BTreeMap, BTreeSet, HashMap},
		error::Error as StdError,
		fmt::{Debug, Display, Formatter, Result as FmtResult},
		future::Future,
		pin::Pin,
		str::FromStr,
		sync::Arc,
	};

	pub use async_lock::Mutex as AsyncMutex;
	pub use parking_lot::Mutex;
	#[cfg(feature = "reqwest")]
	pub use reqwest::{Client as ReqwestClient, Error as ReqwestError};
	pub use serde::{Deserialize, Serialize};
	pub use serde_json::Value;
	pub use thiserror::Error as ThisError;
	pub use time::OffsetDateTime;
	pub use url::Url;

	pub use crate::error::{Error, Result};
}

#[cfg(feature = "reqwest")] pub use reqwest;
pub use url;
#[cfg(feature = "cli")] use {clap as _, color_eyre as _, tokio as _, tracing_subscriber as _};
#[cfg(test)] use {color_eyre as _, httpmock as _};
