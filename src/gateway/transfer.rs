use std::fs::File;
use std::path::Path;
use std::time::Duration;

use super::{FileTransfer, TransferError};

/// Signed-URL transfer over plain HTTP(S): GET to download, PUT to upload.
pub struct HttpFileTransfer {
    client: reqwest::blocking::Client,
}

impl HttpFileTransfer {
    pub fn new(timeout_secs: u64) -> Result<Self, TransferError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(|e| TransferError::HttpClient(e.to_string()))?;
        Ok(Self { client })
    }
}

impl FileTransfer for HttpFileTransfer {
    fn download<'a>(
        &self,
        signed_url: &str,
        local_path: &'a Path,
    ) -> Result<&'a Path, TransferError> {
        let mut response = self
            .client
            .get(signed_url)
            .send()
            .map_err(|e| TransferError::HttpClient(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::Status {
                status: status.as_u16(),
            });
        }

        let mut file = File::create(local_path)?;
        let bytes = response
            .copy_to(&mut file)
            .map_err(|e| TransferError::HttpClient(e.without_url().to_string()))?;
        file.sync_all()?;

        tracing::debug!(bytes, "Staged download complete");
        Ok(local_path)
    }

    fn upload(&self, signed_url: &str, local_path: &Path) -> Result<(), TransferError> {
        let file = File::open(local_path)?;
        let size = file.metadata()?.len();

        let response = self
            .client
            .put(signed_url)
            .body(reqwest::blocking::Body::sized(file, size))
            .send()
            .map_err(|e| TransferError::HttpClient(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(TransferError::Status {
                status: status.as_u16(),
            });
        }

        tracing::debug!(bytes = size, "Upload complete");
        Ok(())
    }
}
