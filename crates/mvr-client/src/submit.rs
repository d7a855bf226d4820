//! Query submission.
//!
//! The portal takes the query as a GET on the service page with the form
//! fields in the query string.

use crate::error::Result;
use crate::parser::ResultParser;
use crate::result::QueryResult;
use crate::session::HttpSession;
use url::Url;

/// Fields of one document status query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueryRequest {
    egn: String,
    surname: String,
    captcha: String,
}

impl QueryRequest {
    /// Create a request. `captcha` may be empty when the form had none.
    #[must_use]
    pub fn new(
        egn: impl Into<String>,
        surname: impl Into<String>,
        captcha: impl Into<String>,
    ) -> Self {
        Self {
            egn: egn.into(),
            surname: surname.into(),
            captcha: captcha.into(),
        }
    }

    /// Personal identification number.
    #[must_use]
    pub fn egn(&self) -> &str {
        &self.egn
    }

    /// Surname in Cyrillic.
    #[must_use]
    pub fn surname(&self) -> &str {
        &self.surname
    }

    /// CAPTCHA answer.
    #[must_use]
    pub fn captcha(&self) -> &str {
        &self.captcha
    }
}

/// Build the submission URL for `request`.
///
/// Parameters are appended in the order the portal's form emits them:
/// `type`, `egn`, `name`, `captcha`, `submitted`.
#[must_use]
pub fn build_query_url(service_url: &Url, service_type: &str, request: &QueryRequest) -> Url {
    let mut url = service_url.clone();
    url.query_pairs_mut()
        .append_pair("type", service_type)
        .append_pair("egn", &request.egn)
        .append_pair("name", &request.surname)
        .append_pair("captcha", &request.captcha)
        .append_pair("submitted", "1");
    url
}

/// Submit a query with the session's cookies and parse the answer.
///
/// Any 2xx body is handed to the parser; the portal reports its own errors
/// inside the page.
pub async fn submit_query(
    session: &HttpSession,
    service_type: &str,
    parser: &ResultParser,
    request: &QueryRequest,
) -> Result<QueryResult> {
    let url = build_query_url(session.service_url(), service_type, request);
    tracing::info!(
        "Submitting query for EGN {} with CAPTCHA '{}'",
        request.egn,
        request.captcha
    );

    let body = session.get_text(&url).await?;
    Ok(parser.parse(&request.egn, &request.surname, body))
}
