//! MVR Client - query the MVR portal for issued and not yet received
//! Bulgarian identity documents.
//!
//! The query is a sequential pipeline: fetch the form page, extract and solve
//! its CAPTCHA, submit the query, parse the HTML answer. [`MvrClient`] wraps
//! it in a bounded retry loop that starts over with a fresh session whenever
//! the portal rejects the CAPTCHA, and stops at the first non-CAPTCHA error.
//!
//! # Example
//!
//! ```rust,ignore
//! use mvr_captcha::AutomaticSolver;
//! use mvr_client::MvrClient;
//! use mvr_core::AppConfig;
//!
//! let config = AppConfig::load_with_env()?;
//! let solver = AutomaticSolver::from_config(&config.captcha)?;
//! let client = MvrClient::new(config.client)?.with_solver(Box::new(solver));
//!
//! let report = client.query_documents("7501010010", "Иванов", None).await?;
//! println!("{}: {}", report.terminal, report.result.result_text());
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

#[allow(missing_docs)]
pub mod error;
pub mod form;
pub mod orchestrator;
pub mod parser;
pub mod result;
pub mod session;
pub mod submit;

// Re-export commonly used types
pub use error::{ClientError, Result};
pub use form::{extract_captcha, fetch_form_page, FormPage};
pub use orchestrator::{MvrClient, QueryReport, Terminal};
pub use parser::{ResultParser, UNPARSED_TEXT};
pub use result::{Outcome, QueryResult};
pub use session::HttpSession;
pub use submit::{build_query_url, submit_query, QueryRequest};
