//! Storage gateway access: signed URLs, source registration and the byte
//! transfer against those URLs.
//!
//! Both collaborators sit behind traits so the pipeline can be driven by the
//! HTTP implementations in production and by in-memory fakes in tests.

pub mod client;
pub mod transfer;

use std::path::Path;

use thiserror::Error;

use crate::models::{RelativePath, SourceDescriptor, StorageProtocol};

pub use client::HttpGateway;
pub use transfer::HttpFileTransfer;

#[derive(Error, Debug)]
pub enum GatewayError {
    #[error("Storage gateway at {0} is unreachable")]
    Unreachable(String),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Storage gateway returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Signed URL missing from gateway response")]
    MissingSignedUrl,

    #[error("Failed to parse gateway response: {0}")]
    ResponseParsing(String),
}

#[derive(Error, Debug)]
pub enum TransferError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("HTTP client error: {0}")]
    HttpClient(String),

    #[error("Object store returned {status}")]
    Status { status: u16 },
}

/// Signed-URL issuer and metadata registry.
pub trait StorageGateway: Send + Sync {
    /// `true` when the gateway answers its liveness probe.
    fn ping(&self) -> Result<bool, GatewayError>;

    fn generate_signed_url_for_download(
        &self,
        descriptor: &SourceDescriptor,
    ) -> Result<String, GatewayError>;

    fn generate_signed_url_for_upload(
        &self,
        descriptor: &SourceDescriptor,
    ) -> Result<String, GatewayError>;

    fn register_new_source_data(&self, descriptor: &SourceDescriptor) -> Result<(), GatewayError>;
}

/// Moves bytes between local disk and a signed URL.
pub trait FileTransfer: Send + Sync {
    /// Download `signed_url` into `local_path`, returning the written path.
    fn download<'a>(&self, signed_url: &str, local_path: &'a Path)
        -> Result<&'a Path, TransferError>;

    fn upload(&self, signed_url: &str, local_path: &Path) -> Result<(), TransferError>;
}

#[derive(Error, Debug)]
pub enum PublishError {
    #[error(transparent)]
    Gateway(#[from] GatewayError),

    #[error(transparent)]
    Transfer(#[from] TransferError),
}

/// Upload one local band file under `path` and register it with the gateway.
///
/// Order: upload URL → PUT → register. Nothing is registered if the upload
/// fails.
pub fn publish_band(
    gateway: &dyn StorageGateway,
    transfer: &dyn FileTransfer,
    path: &RelativePath,
    protocol: StorageProtocol,
    local_file: &Path,
) -> Result<SourceDescriptor, PublishError> {
    let descriptor = SourceDescriptor::for_band(path, protocol);
    let signed_url = gateway.generate_signed_url_for_upload(&descriptor)?;
    transfer.upload(&signed_url, local_file)?;
    gateway.register_new_source_data(&descriptor)?;

    tracing::info!(
        name = %descriptor.name,
        relative_path = %descriptor.relative_path,
        "Band published"
    );
    Ok(descriptor)
}

// ═══════════════════════════════════════════════════════════
// Test doubles
// ═══════════════════════════════════════════════════════════
