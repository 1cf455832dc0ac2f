use async_trait::async_trait;

use crate::error::Result;
use crate::model::{
    Application, ApplicationList, CreateApplicationRequest, PacketFilter, PatchApplicationRequest,
};

/// The subset of the AppRun API a deployment needs.
///
/// [`AppRunClient`](crate::AppRunClient) implements it over HTTP; tests and
/// dry runs can provide their own implementation.
#[async_trait]
pub trait ApplicationApi: Send + Sync {
    /// `GET applications`
    async fn list_applications(&self) -> Result<ApplicationList>;

    /// `POST applications`
    async fn create_application(&self, request: &CreateApplicationRequest) -> Result<Application>;

    /// `GET applications/{id}`
    async fn get_application(&self, id: &str) -> Result<Application>;

    /// `PATCH applications/{id}`, addressed by `request.id`.
    async fn patch_application(&self, request: &PatchApplicationRequest) -> Result<Application>;

    /// `PATCH applications/{id}/packet_filter`
    async fn patch_packet_filter(&self, id: &str, filter: &PacketFilter) -> Result<PacketFilter>;
}
