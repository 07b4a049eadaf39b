use std::time::{Duration, Instant};

use reqwest::StatusCode;
use tracing::debug;

use crate::{error::HydraError, jobset::Job};

static APP_USER_AGENT: &str = concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION"));

/// Retrieves the raw markup of a job page.
pub trait Fetch {
    async fn fetch(&self, job: &Job) -> Result<String, HydraError>;
}

pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> Result<Self, HydraError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(APP_USER_AGENT)
            .build()
            .map_err(|e| HydraError::Fetch(format!("{:?}", e)))?;
        Ok(Self { client })
    }
}

fn handle_status(job: &Job, status: StatusCode) -> Result<(), HydraError> {
    if status == StatusCode::NOT_FOUND {
        Err(HydraError::NotFound {
            ident: job.ident.clone(),
            url: job.url.clone(),
        })
    } else if status.is_success() {
        Ok(())
    } else {
        let status = status.as_u16();
        Err(HydraError::Fetch(format!("Invalid status {status}")))
    }
}

impl Fetch for HttpFetcher {
    async fn fetch(&self, job: &Job) -> Result<String, HydraError> {
        debug!("fetching {}", job.url);
        let started = Instant::now();
        let response = self
            .client
            .get(&job.url)
            .send()
            .await
            .map_err(|e| HydraError::Fetch(format!("{:?}", e)))?;
        handle_status(job, response.status())?;
        let body = response
            .text()
            .await
            .map_err(|e| HydraError::Fetch(format!("{:?}", e)))?;
        debug!("fetched {} bytes in {:?}", body.len(), started.elapsed());
        Ok(body)
    }
}

#[cfg(test)]
mod utils_tests {
    use super::*;

    fn job() -> Job {
        Job::new("https://hydra.nixos.org", "nixpkgs/trunk", "hello.x86_64-linux")
    }

    #[test]
    fn not_found_names_the_job() {
        let err = handle_status(&job(), StatusCode::NOT_FOUND).unwrap_err();
        assert_eq!(
            err.to_string(),
            "package nixpkgs/trunk/hello.x86_64-linux not found at url \
             https://hydra.nixos.org/job/nixpkgs/trunk/hello.x86_64-linux"
        );
        match err {
            HydraError::NotFound { ident, url } => {
                assert_eq!(ident, "nixpkgs/trunk/hello.x86_64-linux");
                assert_eq!(url, "https://hydra.nixos.org/job/nixpkgs/trunk/hello.x86_64-linux");
            }
            other => panic!("unexpected {other:?}"),
        }
    }

    #[test]
    fn other_statuses() {
        assert!(handle_status(&job(), StatusCode::OK).is_ok());
        match handle_status(&job(), StatusCode::BAD_GATEWAY) {
            Err(HydraError::Fetch(msg)) => assert_eq!(msg, "Invalid status 502"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
