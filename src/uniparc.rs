use reqwest::StatusCode;
use reqwest::blocking::Client;
use reqwest::header::{ACCEPT, HeaderMap, HeaderValue, USER_AGENT};

use crate::config::ServiceConfig;
use crate::domain::UniparcId;
use crate::error::KiraError;

pub trait UniparcClient {
    /// Raw FASTA text for `id`. Exactly one request, no retries.
    fn fetch_fasta(&self, gene: &str, id: &UniparcId) -> Result<String, KiraError>;
}

#[derive(Clone)]
pub struct UniparcHttpClient {
    client: Client,
    base_url: String,
}

impl UniparcHttpClient {
    pub fn new(service: &ServiceConfig) -> Result<Self, KiraError> {
        let mut headers = HeaderMap::new();
        headers.insert(
            USER_AGENT,
            HeaderValue::from_str(&service.user_agent)
                .map_err(|err| KiraError::ConfigValue(format!("service.user_agent: {err}")))?,
        );
        headers.insert(ACCEPT, HeaderValue::from_static("text/plain"));
        let client = Client::builder()
            .default_headers(headers)
            .timeout(service.timeout)
            .build()
            .map_err(|err| KiraError::ConfigValue(format!("http client: {err}")))?;
        Ok(Self {
            client,
            base_url: service.base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn fasta_url(&self, id: &UniparcId) -> String {
        format!("{}/{}.fasta", self.base_url, id.as_str())
    }
}

impl UniparcClient for UniparcHttpClient {
    fn fetch_fasta(&self, gene: &str, id: &UniparcId) -> Result<String, KiraError> {
        let http_err = |err: reqwest::Error| KiraError::FetchHttp {
            identifier: id.to_string(),
            gene: gene.to_string(),
            message: err.to_string(),
        };

        let response = self.client.get(self.fasta_url(id)).send().map_err(http_err)?;
        handle_status(response.status(), gene, id)?;
        response.text().map_err(http_err)
    }
}

/// Anything but `200 OK` is a failure; a `206` body would be a partial record.
fn handle_status(status: StatusCode, gene: &str, id: &UniparcId) -> Result<(), KiraError> {
    if status == StatusCode::OK {
        return Ok(());
    }
    Err(KiraError::FetchStatus {
        identifier: id.to_string(),
        gene: gene.to_string(),
        status: status.as_u16(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_200_is_accepted() {
        let id: UniparcId = "UPI0000000001".parse().unwrap();
        assert!(handle_status(StatusCode::OK, "TP53", &id).is_ok());
        for status in [
            StatusCode::PARTIAL_CONTENT,
            StatusCode::NO_CONTENT,
            StatusCode::NOT_FOUND,
        ] {
            let err = handle_status(status, "TP53", &id).unwrap_err();
            assert!(matches!(
                err,
                KiraError::FetchStatus { status: code, .. } if code == status.as_u16()
            ));
        }
    }

    #[test]
    fn url_uses_configured_base() {
        let service = ServiceConfig {
            base_url: "http://localhost:8080/uniparc/".to_string(),
            ..ServiceConfig::default()
        };
        let client = UniparcHttpClient::new(&service).unwrap();
        let id: UniparcId = "UPI0000000001".parse().unwrap();
        assert_eq!(
            client.fasta_url(&id),
            "http://localhost:8080/uniparc/UPI0000000001.fasta"
        );
    }
}
