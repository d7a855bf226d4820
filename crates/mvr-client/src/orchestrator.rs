//! Bounded CAPTCHA retry loop.
//!
//! Each attempt starts from an empty cookie jar, so the portal hands out a
//! new session and a new challenge:
//!
//! ```text
//! reset cookies -> fetch form -> extract CAPTCHA -> solve -> submit -> evaluate
//!        ^                                                              |
//!        +----------------- CAPTCHA rejected, budget left --------------+
//! ```
//!
//! Only a rejected CAPTCHA loops. Success, a query error and an unparsed
//! response all end the loop, as does any transport failure (returned as an
//! error, never retried).

use crate::error::{ClientError, Result};
use crate::form::{extract_captcha, fetch_form_page};
use crate::parser::ResultParser;
use crate::result::QueryResult;
use crate::session::HttpSession;
use crate::submit::{submit_query, QueryRequest};
use mvr_captcha::CaptchaSolver;
use mvr_core::ClientConfig;
use std::fmt;

/// How a query run ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Terminal {
    /// The portal accepted the query
    Success,
    /// The portal returned something other than a CAPTCHA rejection
    PermanentFailure,
    /// Every attempt in the budget ended with a rejected CAPTCHA
    RetryExhausted,
    /// The CAPTCHA came from the caller or an operator and was submitted once
    SingleSubmit,
}

impl fmt::Display for Terminal {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Self::Success => "success",
            Self::PermanentFailure => "permanent failure",
            Self::RetryExhausted => "retries exhausted",
            Self::SingleSubmit => "single submit",
        };
        f.write_str(label)
    }
}

/// What to do after evaluating one attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Step {
    Stop(Terminal),
    Retry,
}

/// Decide the next step from the result of attempt number `attempt` (1-based).
fn evaluate(result: &QueryResult, attempt: u32, budget: u32) -> Step {
    if result.success() {
        Step::Stop(Terminal::Success)
    } else if !result.is_captcha_error() {
        Step::Stop(Terminal::PermanentFailure)
    } else if attempt < budget {
        Step::Retry
    } else {
        Step::Stop(Terminal::RetryExhausted)
    }
}

/// Final result of [`MvrClient::query_documents`].
#[derive(Debug, Clone)]
pub struct QueryReport {
    /// Result of the last submission
    pub result: QueryResult,
    /// Why the run stopped
    pub terminal: Terminal,
    /// Number of submissions made
    pub attempts: u32,
}

/// Client for the MVR document status service.
pub struct MvrClient {
    session: HttpSession,
    parser: ResultParser,
    solver: Option<Box<dyn CaptchaSolver>>,
    service_type: String,
    max_retries: u32,
}

impl MvrClient {
    /// Create a client without a solver.
    ///
    /// Such a client can only submit caller-provided CAPTCHAs or forms that
    /// have no CAPTCHA at all.
    pub fn new(config: ClientConfig) -> Result<Self> {
        let session = HttpSession::new(&config)?;
        Ok(Self {
            session,
            parser: ResultParser::new(),
            solver: None,
            service_type: config.service_type,
            max_retries: config.max_retries,
        })
    }

    /// Use `solver` for CAPTCHAs found in the form.
    #[must_use]
    pub fn with_solver(mut self, solver: Box<dyn CaptchaSolver>) -> Self {
        self.solver = Some(solver);
        self
    }

    /// Override the retry budget. Values below 1 are raised to 1.
    #[must_use]
    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries.max(1);
        self
    }

    /// Maximum number of fetch-solve-submit cycles per query.
    #[must_use]
    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    /// The underlying HTTP session.
    #[must_use]
    pub fn session(&self) -> &HttpSession {
        &self.session
    }

    /// Query the status of documents issued to `egn` / `surname`.
    ///
    /// A non-empty `captcha` is submitted once as-is, without fetching the
    /// form. Otherwise the form is fetched and its CAPTCHA solved, up to
    /// [`Self::max_retries`] times while the portal keeps rejecting the
    /// answer.
    ///
    /// # Errors
    /// Transport failures, CAPTCHA decoding or solving failures, and a form
    /// with a CAPTCHA when no solver is configured.
    pub async fn query_documents(
        &self,
        egn: &str,
        surname: &str,
        captcha: Option<&str>,
    ) -> Result<QueryReport> {
        if let Some(captcha) = captcha.filter(|c| !c.is_empty()) {
            tracing::info!("Using provided CAPTCHA, submitting once");
            let request = QueryRequest::new(egn, surname, captcha);
            let result = self.submit(&request).await?;
            return Ok(QueryReport {
                result,
                terminal: Terminal::SingleSubmit,
                attempts: 1,
            });
        }

        let mut attempt = 0;
        loop {
            attempt += 1;
            tracing::info!("Attempt {}/{}", attempt, self.max_retries);

            self.session.reset_cookies();
            let page = fetch_form_page(&self.session).await?;

            let (guess, single_shot) = match extract_captcha(&self.session, &page).await? {
                None => {
                    tracing::warn!("No CAPTCHA found in form, submitting without one");
                    (String::new(), false)
                }
                Some(image) => {
                    let solver = self.solver.as_deref().ok_or(ClientError::NoSolver)?;
                    let guess = solver.solve(&image).await?;
                    (guess, !solver.allows_retry())
                }
            };

            let request = QueryRequest::new(egn, surname, guess);
            let result = self.submit(&request).await?;

            if single_shot {
                return Ok(QueryReport {
                    result,
                    terminal: Terminal::SingleSubmit,
                    attempts: attempt,
                });
            }

            match evaluate(&result, attempt, self.max_retries) {
                Step::Retry => {
                    tracing::warn!("CAPTCHA rejected: {}", result.result_text());
                }
                Step::Stop(terminal) => {
                    match terminal {
                        Terminal::RetryExhausted => {
                            tracing::warn!("Giving up after {} attempts", attempt);
                        }
                        Terminal::PermanentFailure => {
                            tracing::warn!("Query failed: {}", result.result_text());
                        }
                        _ => tracing::info!("Query succeeded on attempt {}", attempt),
                    }
                    return Ok(QueryReport {
                        result,
                        terminal,
                        attempts: attempt,
                    });
                }
            }
        }
    }

    async fn submit(&self, request: &QueryRequest) -> Result<QueryResult> {
        submit_query(&self.session, &self.service_type, &self.parser, request).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::Outcome;

    fn result(outcome: Outcome) -> QueryResult {
        QueryResult::new(outcome, "7501010010", "Иванов", "", "")
    }

    #[test]
    fn test_success_stops() {
        assert_eq!(
            evaluate(&result(Outcome::Success), 1, 3),
            Step::Stop(Terminal::Success)
        );
    }

    #[test]
    fn test_captcha_error_retries_while_budget_left() {
        let rejected = result(Outcome::CaptchaError);
        assert_eq!(evaluate(&rejected, 1, 3), Step::Retry);
        assert_eq!(evaluate(&rejected, 2, 3), Step::Retry);
        assert_eq!(
            evaluate(&rejected, 3, 3),
            Step::Stop(Terminal::RetryExhausted)
        );
    }

    #[test]
    fn test_single_attempt_budget_never_retries() {
        assert_eq!(
            evaluate(&result(Outcome::CaptchaError), 1, 1),
            Step::Stop(Terminal::RetryExhausted)
        );
    }

    #[test]
    fn test_query_error_and_unparsed_are_permanent() {
        assert_eq!(
            evaluate(&result(Outcome::QueryError), 1, 5),
            Step::Stop(Terminal::PermanentFailure)
        );
        assert_eq!(
            evaluate(&result(Outcome::Unparsed), 1, 5),
            Step::Stop(Terminal::PermanentFailure)
        );
    }

    #[test]
    fn test_retry_override_is_clamped() {
        let client = MvrClient::new(ClientConfig::default())
            .expect("client")
            .with_max_retries(0);
        assert_eq!(client.max_retries(), 1);
    }
}
