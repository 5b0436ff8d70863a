use crate::api::ApiClient;
use crate::config::MailConfig;
use crate::error::{ApiError, Result};
use reqwest::header::AUTHORIZATION;
use reqwest::multipart::Form;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

const DELIVERABLE: &str = "Deliverable";
const SUCCESS: &str = "Success";
/// Verification status recorded for a deliverable address.
const VERIFIED_STATUS: u8 = 1;

/// Verdict of the external e-mail verification service.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmailVerdict {
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub classification: Option<String>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl EmailVerdict {
    #[must_use]
    pub fn is_deliverable(&self) -> bool {
        self.status.as_deref() == Some(SUCCESS) && self.classification.as_deref() == Some(DELIVERABLE)
    }
}

#[derive(Serialize)]
struct VerificationStatus<'a> {
    status: u8,
    identifier: &'a str,
}

/// Checks patient e-mail addresses against the external verifier and records
/// successful checks on the patient.
#[derive(Clone, Debug)]
pub struct EmailVerificationService {
    client: ApiClient,
    http: reqwest::Client,
    config: MailConfig,
}

impl EmailVerificationService {
    /// # Errors
    /// Returns `Transport` if the HTTP client cannot be initialized.
    pub fn new(client: ApiClient, config: MailConfig) -> Result<Self> {
        let http = reqwest::Client::builder().timeout(client.config().request_timeout()).build()?;
        Ok(Self { client, http, config })
    }

    /// Verifies `email`. When it is deliverable and `rut` is given, the patient
    /// is marked as verified; a failure to record that is logged, since the
    /// address itself was verified.
    ///
    /// # Errors
    /// - `Config` when the verifier URL or token is not configured.
    /// - `Http` when the verifier rejects the call.
    /// - `BadRequest` carrying the classification when the address is not deliverable.
    #[tracing::instrument(err, skip(self, email))]
    pub async fn verify(&self, email: &str, rut: Option<&str>) -> Result<EmailVerdict> {
        let (Some(url), Some(token)) = (&self.config.mail_url, &self.config.mail_token) else {
            return Err(ApiError::Config("e-mail verification service is not configured".into()));
        };
        if rut.is_none() {
            tracing::warn!("Verifying e-mail without a patient identifier; result will not be recorded");
        }

        let form = Form::new().text("email", email.to_string());
        let response = self.http.post(url).header(AUTHORIZATION, token).multipart(form).send().await?;

        let status = response.status();
        let body = response.bytes().await?;
        if !status.is_success() {
            return Err(ApiError::from_response(status, &body));
        }

        let verdict: EmailVerdict = serde_json::from_slice(&body)?;
        if !verdict.is_deliverable() {
            let reason = verdict.classification.unwrap_or_else(|| "Email no válido".to_string());
            return Err(ApiError::BadRequest(reason));
        }

        if let Some(rut) = rut {
            let recorded: Result<Value> = self
                .client
                .post("/statusVerifalia", &VerificationStatus { status: VERIFIED_STATUS, identifier: rut })
                .await;
            match recorded {
                Ok(_) => tracing::info!("Verification status recorded"),
                Err(e) => tracing::error!(error = %e, "E-mail verified but recording the status failed"),
            }
        }

        Ok(verdict)
    }
}
