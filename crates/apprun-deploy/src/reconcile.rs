//! One deployment run: resolve the application by name, create or patch it,
//! then patch its packet filter.
//!
//! The two writes are not atomic. When the packet filter patch fails the
//! application keeps its new state and a rerun converges it.

use apprun_client::model::{Application, PacketFilter, PatchApplicationRequest};
use apprun_client::{ApplicationApi, ApplicationDirectory};

use crate::config::{self, ApplicationRequest};
use crate::error::Result;
use crate::inputs::Inputs;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Created,
    Updated,
}

impl std::fmt::Display for Action {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Created => write!(f, "created"),
            Self::Updated => write!(f, "updated"),
        }
    }
}

/// Result of a successful run.
#[derive(Debug, Clone, PartialEq)]
pub struct Outcome {
    pub action: Action,
    pub application_id: String,
    pub public_url: String,
    /// Packet filter as stored by the API.
    pub packet_filter: PacketFilter,
}

pub async fn reconcile<A>(api: &A, inputs: &Inputs<'_>) -> Result<Outcome>
where
    A: ApplicationApi + ?Sized,
{
    let directory = ApplicationDirectory::load(api).await?;
    let deployment = config::build_deployment(inputs, &directory)?;

    let (action, application) = match deployment.request {
        ApplicationRequest::Create(request) => {
            tracing::info!(name = %request.name, "creating application");
            let created = api.create_application(&request).await?;
            (Action::Created, created)
        }
        ApplicationRequest::Patch(mut request) => {
            if deployment.inherit_env {
                inherit_live_env(api, &mut request).await?;
            }
            tracing::info!(id = %request.id, name = ?request.name, "updating application");
            let patched = api.patch_application(&request).await?;
            (Action::Updated, patched)
        }
    };
    tracing::info!(
        id = %application.id,
        status = %application.status,
        public_url = %application.public_url,
        "application {action}"
    );

    let packet_filter = api
        .patch_packet_filter(&application.id, &deployment.packet_filter)
        .await?;
    tracing::info!(
        id = %application.id,
        enabled = packet_filter.is_enabled,
        entries = packet_filter.settings.len(),
        "packet filter updated"
    );

    let Application { id, public_url, .. } = application;
    Ok(Outcome {
        action,
        application_id: id,
        public_url,
        packet_filter,
    })
}

/// Swap the outgoing component env for the one currently deployed.
async fn inherit_live_env<A>(api: &A, request: &mut PatchApplicationRequest) -> Result<()>
where
    A: ApplicationApi + ?Sized,
{
    let live = api.get_application(&request.id).await?;
    let live_env = live
        .components
        .into_iter()
        .next()
        .and_then(|component| component.env);
    tracing::info!(
        id = %request.id,
        variables = live_env.as_ref().map_or(0, Vec::len),
        "inheriting env from live application"
    );
    if let Some(component) = request.components.as_mut().and_then(|c| c.first_mut()) {
        component.env = live_env;
    }
    Ok(())
}
