//! Cookie-holding fetch session with strict PDF validation.
//!
//! Government document servers sit behind anti-automation defenses: session
//! cookies, referer checks, and mis-served content types. The session keeps
//! one cookie jar for the whole run, presents a browser identity, and
//! accepts a payload only if it passes the triple check (PDF-equivalent
//! mime AND minimum size AND `%PDF-` signature). A rejected or failed
//! attempt is retried exactly once after a short delay, with a broadened
//! Accept header.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use reqwest::cookie::Jar;
use reqwest::header::{ACCEPT, REFERER};
use tracing::{debug, instrument, warn};
use url::Url;
use uuid::Uuid;

use regcorpus_shared::{FetchPoliciesConfig, RegcorpusError, Result};

/// Browser-identity User-Agent. Automated identities get blocked outright.
const USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64) AppleWebKit/537.36 \
     (KHTML, like Gecko) Chrome/124.0.0.0 Safari/537.36";

/// Redirect-following bound.
const MAX_REDIRECTS: usize = 8;

/// Minimum plausible size for a regulatory PDF. Block pages and error
/// interstitials come in well under this.
const MIN_PDF_BYTES: usize = 10 * 1024;

/// Canonical PDF signature bytes.
const PDF_MAGIC: &[u8] = b"%PDF-";

/// First-attempt Accept header, favoring PDF content.
const ACCEPT_PDF: &str = "application/pdf,application/octet-stream;q=0.9,*/*;q=0.8";

/// Broadened Accept header for the single retry.
const ACCEPT_ANY: &str = "*/*";

// ---------------------------------------------------------------------------
// FetchResult
// ---------------------------------------------------------------------------

/// Whether a fetch produced an accepted PDF payload.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FetchStatus {
    Ok,
    Fail,
}

/// Why a fetch failed after its retry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FetchFailure {
    /// Timeout or connection failure.
    Network(String),
    /// The redirect bound was exceeded.
    TooManyRedirects,
    /// The payload failed the mime/size/signature check.
    Validation(String),
}

impl std::fmt::Display for FetchFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Network(msg) => write!(f, "network: {msg}"),
            Self::TooManyRedirects => write!(f, "too many redirects"),
            Self::Validation(msg) => write!(f, "validation: {msg}"),
        }
    }
}

/// Outcome of fetching one document.
#[derive(Debug, Clone)]
pub struct FetchResult {
    pub status: FetchStatus,
    /// Content-Type reported by the final response (empty on network failure).
    pub mime_type: String,
    pub byte_size: usize,
    /// URL after redirect-following (the requested URL on network failure).
    pub final_url: String,
    /// Validated payload; empty on failure.
    pub body: Vec<u8>,
    /// Failure reason when `status` is [`FetchStatus::Fail`].
    pub failure: Option<FetchFailure>,
}

impl FetchResult {
    pub fn is_ok(&self) -> bool {
        self.status == FetchStatus::Ok
    }

    fn failed(url: &str, failure: FetchFailure) -> Self {
        Self {
            status: FetchStatus::Fail,
            mime_type: String::new(),
            byte_size: 0,
            final_url: url.to_string(),
            body: Vec::new(),
            failure: Some(failure),
        }
    }
}

// ---------------------------------------------------------------------------
// FetchSession
// ---------------------------------------------------------------------------

/// HTTP session reused across all documents in a run.
///
/// Cookie state is explicit and owned here, not process-global: any cookies
/// a server sets on one attempt are replayed on later attempts and later
/// documents in the same run.
pub struct FetchSession {
    client: Client,
    retry_delay: Duration,
    referer_override: Option<String>,
}

impl FetchSession {
    /// Build a session from the fetch policies.
    pub fn new(policies: &FetchPoliciesConfig) -> Result<Self> {
        // The jar lives for the whole session; every response's cookies are
        // replayed on subsequent requests.
        let cookies = Arc::new(Jar::default());

        let client = Client::builder()
            .user_agent(USER_AGENT)
            .cookie_provider(cookies)
            .redirect(reqwest::redirect::Policy::limited(MAX_REDIRECTS))
            .timeout(Duration::from_secs(policies.timeout_secs))
            .build()
            .map_err(|e| RegcorpusError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            client,
            retry_delay: Duration::from_millis(policies.retry_delay_ms),
            referer_override: policies.referer.clone(),
        })
    }

    /// Fetch one document URL, validating the payload as a PDF.
    ///
    /// Never returns an error: network and validation problems are converted
    /// into a [`FetchStatus::Fail`] result so a single document can never
    /// abort the batch.
    #[instrument(skip(self), fields(url = %url))]
    pub async fn fetch_pdf(&self, url: &str) -> FetchResult {
        match self.attempt(url, ACCEPT_PDF).await {
            Ok(result) => return result,
            Err(failure) => {
                warn!(%url, %failure, "fetch attempt rejected, retrying once");
            }
        }

        tokio::time::sleep(self.retry_delay).await;

        match self.attempt(url, ACCEPT_ANY).await {
            Ok(result) => result,
            Err(failure) => {
                warn!(%url, %failure, "fetch failed after retry");
                FetchResult::failed(url, failure)
            }
        }
    }

    /// One GET attempt. Returns the failure class so the caller can decide
    /// whether a retry remains.
    async fn attempt(
        &self,
        url: &str,
        accept: &str,
    ) -> std::result::Result<FetchResult, FetchFailure> {
        let referer = self
            .referer_override
            .clone()
            .or_else(|| origin_of(url))
            .unwrap_or_default();

        let response = self
            .client
            .get(url)
            .header(ACCEPT, accept)
            .header(REFERER, referer)
            .send()
            .await
            .map_err(classify_request_error)?;

        let status = response.status();
        if !status.is_success() {
            return Err(FetchFailure::Network(format!("HTTP {status}")));
        }

        let final_url = response.url().to_string();
        let mime_type = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .unwrap_or("")
            .to_string();

        let body = response
            .bytes()
            .await
            .map_err(|e| FetchFailure::Network(format!("body read failed: {e}")))?
            .to_vec();

        validate_payload(&mime_type, &body).map_err(FetchFailure::Validation)?;

        debug!(
            %final_url,
            mime = %mime_type,
            bytes = body.len(),
            "payload accepted"
        );

        Ok(FetchResult {
            status: FetchStatus::Ok,
            mime_type,
            byte_size: body.len(),
            final_url,
            body,
            failure: None,
        })
    }
}

/// Map a reqwest error to the fetch failure taxonomy.
fn classify_request_error(e: reqwest::Error) -> FetchFailure {
    if e.is_redirect() {
        FetchFailure::TooManyRedirects
    } else {
        FetchFailure::Network(e.to_string())
    }
}

/// Origin (scheme + host root) of a URL, used as the default Referer.
fn origin_of(url: &str) -> Option<String> {
    let parsed = Url::parse(url).ok()?;
    let mut origin = parsed.clone();
    origin.set_path("/");
    origin.set_query(None);
    origin.set_fragment(None);
    Some(origin.to_string())
}

// ---------------------------------------------------------------------------
// Payload validation
// ---------------------------------------------------------------------------

/// The strict triple check: PDF-equivalent mime AND minimum size AND
/// signature bytes. All three must hold.
fn validate_payload(mime_type: &str, body: &[u8]) -> std::result::Result<(), String> {
    if !is_pdf_mime(mime_type) {
        return Err(format!("content-type '{mime_type}' is not PDF-equivalent"));
    }

    if body.len() < MIN_PDF_BYTES {
        return Err(format!(
            "payload is {} bytes, below the {MIN_PDF_BYTES}-byte minimum",
            body.len()
        ));
    }

    if !body.starts_with(PDF_MAGIC) {
        return Err("payload does not begin with the PDF signature".into());
    }

    Ok(())
}

/// PDF-equivalent content types. Octet-stream variants count: government
/// servers routinely mis-serve PDFs, and the signature bytes are the
/// authoritative part of the check.
fn is_pdf_mime(mime_type: &str) -> bool {
    let essence = mime_type
        .split(';')
        .next()
        .unwrap_or("")
        .trim()
        .to_ascii_lowercase();

    matches!(
        essence.as_str(),
        "application/pdf" | "application/x-pdf" | "application/octet-stream"
            | "binary/octet-stream"
    )
}

// ---------------------------------------------------------------------------
// Atomic writes
// ---------------------------------------------------------------------------

/// Write `body` to `path` via a temp file and atomic rename, so a crash
/// mid-write never leaves a partial file at the final path.
pub fn write_atomic(path: &Path, body: &[u8]) -> Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent).map_err(|e| RegcorpusError::io(parent, e))?;
    }

    let file_name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_string())
        .unwrap_or_else(|| "payload".to_string());
    let temp = path.with_file_name(format!(".{file_name}.tmp-{}", Uuid::now_v7()));

    std::fs::write(&temp, body).map_err(|e| RegcorpusError::io(&temp, e))?;
    std::fs::rename(&temp, path).map_err(|e| RegcorpusError::io(path, e))?;

    debug!(path = %path.display(), bytes = body.len(), "wrote file atomically");
    Ok(())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    /// A payload that passes the triple check.
    fn valid_pdf_body() -> Vec<u8> {
        let mut body = b"%PDF-1.7\n".to_vec();
        body.resize(MIN_PDF_BYTES + 512, b' ');
        body
    }

    fn test_policies() -> FetchPoliciesConfig {
        FetchPoliciesConfig {
            timeout_secs: 5,
            // Keep the retry path fast in tests.
            retry_delay_ms: 10,
            referer: None,
        }
    }

    // --- Pure validation tests ---

    #[test]
    fn triple_check_accepts_conforming_payload() {
        assert!(validate_payload("application/pdf", &valid_pdf_body()).is_ok());
    }

    #[test]
    fn triple_check_rejects_wrong_mime() {
        let err = validate_payload("text/html", &valid_pdf_body()).unwrap_err();
        assert!(err.contains("not PDF-equivalent"));
    }

    #[test]
    fn triple_check_rejects_undersized_payload() {
        let err = validate_payload("application/pdf", b"%PDF-1.7 tiny").unwrap_err();
        assert!(err.contains("below"));
    }

    #[test]
    fn triple_check_rejects_bad_signature() {
        let mut body = vec![0u8; MIN_PDF_BYTES + 1];
        body[..5].copy_from_slice(b"<html");
        let err = validate_payload("application/pdf", &body).unwrap_err();
        assert!(err.contains("signature"));
    }

    #[test]
    fn minimum_size_boundary_is_inclusive() {
        let mut body = b"%PDF-1.7\n".to_vec();
        body.resize(MIN_PDF_BYTES, b' ');
        assert!(validate_payload("application/pdf", &body).is_ok());

        body.pop();
        assert!(validate_payload("application/pdf", &body).is_err());
    }

    #[test]
    fn octet_stream_counts_as_pdf_equivalent() {
        assert!(is_pdf_mime("application/octet-stream"));
        assert!(is_pdf_mime("application/pdf; charset=binary"));
        assert!(is_pdf_mime("Application/PDF"));
        assert!(!is_pdf_mime("text/html; charset=utf-8"));
        assert!(!is_pdf_mime(""));
    }

    // --- Session tests against a mock server ---

    #[tokio::test]
    async fn fetch_accepts_valid_pdf() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rules/001.pdf"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/pdf")
                    .set_body_bytes(valid_pdf_body()),
            )
            .expect(1)
            .mount(&server)
            .await;

        let session = FetchSession::new(&test_policies()).unwrap();
        let result = session
            .fetch_pdf(&format!("{}/rules/001.pdf", server.uri()))
            .await;

        assert!(result.is_ok());
        assert_eq!(result.mime_type, "application/pdf");
        assert!(result.byte_size >= MIN_PDF_BYTES);
        assert!(result.body.starts_with(b"%PDF-"));
    }

    #[tokio::test]
    async fn fetch_accepts_misserved_octet_stream() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/rules/002.pdf"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/octet-stream")
                    .set_body_bytes(valid_pdf_body()),
            )
            .mount(&server)
            .await;

        let session = FetchSession::new(&test_policies()).unwrap();
        let result = session
            .fetch_pdf(&format!("{}/rules/002.pdf", server.uri()))
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn rejected_fetch_retries_exactly_once() {
        let server = MockServer::start().await;

        // An HTML block page: fails validation on both attempts.
        Mock::given(method("GET"))
            .and(path("/blocked.pdf"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string("<html>access denied</html>"),
            )
            .expect(2)
            .mount(&server)
            .await;

        let session = FetchSession::new(&test_policies()).unwrap();
        let result = session
            .fetch_pdf(&format!("{}/blocked.pdf", server.uri()))
            .await;

        assert!(!result.is_ok());
        assert!(matches!(result.failure, Some(FetchFailure::Validation(_))));
    }

    #[tokio::test]
    async fn undersized_payload_retries_once_then_fails() {
        let server = MockServer::start().await;

        // Right mime and signature, but far too small to be a real document.
        Mock::given(method("GET"))
            .and(path("/stub.pdf"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/pdf")
                    .set_body_bytes(b"%PDF-1.7 stub".to_vec()),
            )
            .expect(2)
            .mount(&server)
            .await;

        let session = FetchSession::new(&test_policies()).unwrap();
        let result = session
            .fetch_pdf(&format!("{}/stub.pdf", server.uri()))
            .await;

        assert!(!result.is_ok());
        assert!(matches!(result.failure, Some(FetchFailure::Validation(_))));
    }

    #[tokio::test]
    async fn retry_broadens_accept_header_and_succeeds() {
        let server = MockServer::start().await;

        // First attempt (PDF-favoring Accept) gets a block page.
        Mock::given(method("GET"))
            .and(path("/fussy.pdf"))
            .and(header("accept", ACCEPT_PDF))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .set_body_string("<html>nope</html>"),
            )
            .expect(1)
            .mount(&server)
            .await;

        // Retry with the broadened Accept succeeds.
        Mock::given(method("GET"))
            .and(path("/fussy.pdf"))
            .and(header("accept", ACCEPT_ANY))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/pdf")
                    .set_body_bytes(valid_pdf_body()),
            )
            .expect(1)
            .mount(&server)
            .await;

        let session = FetchSession::new(&test_policies()).unwrap();
        let result = session
            .fetch_pdf(&format!("{}/fussy.pdf", server.uri()))
            .await;

        assert!(result.is_ok());
    }

    #[tokio::test]
    async fn http_error_status_is_network_failure() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/forbidden.pdf"))
            .respond_with(ResponseTemplate::new(403))
            .expect(2)
            .mount(&server)
            .await;

        let session = FetchSession::new(&test_policies()).unwrap();
        let result = session
            .fetch_pdf(&format!("{}/forbidden.pdf", server.uri()))
            .await;

        assert!(!result.is_ok());
        match result.failure {
            Some(FetchFailure::Network(msg)) => assert!(msg.contains("403")),
            other => panic!("expected network failure, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn connection_failure_is_network_failure() {
        let session = FetchSession::new(&test_policies()).unwrap();
        // Port 1 is reserved and closed; the connection is refused.
        let result = session.fetch_pdf("http://127.0.0.1:1/doc.pdf").await;

        assert!(!result.is_ok());
        assert!(matches!(result.failure, Some(FetchFailure::Network(_))));
    }

    #[tokio::test]
    async fn redirect_loop_is_distinct_failure() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/loop.pdf"))
            .respond_with(
                ResponseTemplate::new(302).insert_header("location", "/loop.pdf"),
            )
            .mount(&server)
            .await;

        let session = FetchSession::new(&test_policies()).unwrap();
        let result = session
            .fetch_pdf(&format!("{}/loop.pdf", server.uri()))
            .await;

        assert!(!result.is_ok());
        assert_eq!(result.failure, Some(FetchFailure::TooManyRedirects));
    }

    #[tokio::test]
    async fn session_replays_cookies_across_documents() {
        let server = MockServer::start().await;

        // First document sets a session cookie.
        Mock::given(method("GET"))
            .and(path("/first.pdf"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/pdf")
                    .insert_header("set-cookie", "session=abc123; Path=/")
                    .set_body_bytes(valid_pdf_body()),
            )
            .mount(&server)
            .await;

        // Second document only answers when the cookie comes back.
        Mock::given(method("GET"))
            .and(path("/second.pdf"))
            .and(header("cookie", "session=abc123"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/pdf")
                    .set_body_bytes(valid_pdf_body()),
            )
            .expect(1)
            .mount(&server)
            .await;

        let session = FetchSession::new(&test_policies()).unwrap();
        let first = session
            .fetch_pdf(&format!("{}/first.pdf", server.uri()))
            .await;
        let second = session
            .fetch_pdf(&format!("{}/second.pdf", server.uri()))
            .await;

        assert!(first.is_ok());
        assert!(second.is_ok());
    }

    #[tokio::test]
    async fn referer_defaults_to_url_origin() {
        let server = MockServer::start().await;
        let origin = format!("{}/", server.uri());

        Mock::given(method("GET"))
            .and(path("/deep/path/doc.pdf"))
            .and(header("referer", origin.as_str()))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "application/pdf")
                    .set_body_bytes(valid_pdf_body()),
            )
            .expect(1)
            .mount(&server)
            .await;

        let session = FetchSession::new(&test_policies()).unwrap();
        let result = session
            .fetch_pdf(&format!("{}/deep/path/doc.pdf", server.uri()))
            .await;

        assert!(result.is_ok());
    }

    // --- Atomic write tests ---

    #[test]
    fn write_atomic_creates_parents_and_leaves_no_temp() {
        let dir = std::env::temp_dir().join(format!("regcorpus-fetch-test-{}", Uuid::now_v7()));
        let target = dir.join("pdfs").join("001.pdf");

        write_atomic(&target, b"%PDF-1.7 test").unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"%PDF-1.7 test");
        for entry in std::fs::read_dir(target.parent().unwrap()).unwrap() {
            let name = entry.unwrap().file_name().to_string_lossy().to_string();
            assert!(!name.starts_with('.'), "temp file left behind: {name}");
        }

        let _ = std::fs::remove_dir_all(&dir);
    }

    #[test]
    fn write_atomic_overwrites_existing() {
        let dir = std::env::temp_dir().join(format!("regcorpus-fetch-test-{}", Uuid::now_v7()));
        let target = dir.join("doc.pdf");

        write_atomic(&target, b"first").unwrap();
        write_atomic(&target, b"second").unwrap();

        assert_eq!(std::fs::read(&target).unwrap(), b"second");
        let _ = std::fs::remove_dir_all(&dir);
    }
}
