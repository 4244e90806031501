pub mod logger;

pub mod batch;
pub mod cli;
pub mod client;
pub mod constants;
pub mod credentials;
pub mod error;
pub mod utils;
pub mod validation;

pub use batch::{dispatch_results, run_batch, shrink_all, BatchSummary, DispatchOptions, ResultMapping};
pub use client::{
    probe_host, OutputUrlMatcher, ServiceConfig, ShrinkResult, ShrinkService, TinyPngClient,
};
pub use credentials::{prompt_for_key, Credential, CredentialSource, CredentialStore};
pub use error::{Result, ShrinkError};
pub use utils::derive_output_name;
pub use validation::{collect_candidates, sniff_mime, validate_candidate};
