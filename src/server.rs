use std::sync::Arc;

use rmcp::handler::server::router::tool::ToolRouter;
use rmcp::handler::server::wrapper::Parameters;
use rmcp::model::{CallToolResult, Implementation, ServerCapabilities, ServerInfo};
use rmcp::{ErrorData as McpError, ServerHandler, tool, tool_handler, tool_router};

use crate::channel::{self, Method};
use crate::platform::{AppContext, Surface};
use crate::response::MethodReply;
use crate::session::ReviewSession;
use crate::tools::{ActivityResultRequest, InvokeRequest, LifecycleEvent, LifecycleRequest};

#[derive(Clone)]
pub struct ReviewServer {
    session: Arc<ReviewSession>,
    tool_router: ToolRouter<Self>,
}

#[tool_router]
impl ReviewServer {
    pub fn new(session: Arc<ReviewSession>) -> Self {
        Self {
            session,
            tool_router: Self::tool_router(),
        }
    }

    #[tool(
        name = "is_available",
        description = "Check whether the in-app review service can be used right now. Warms the review token so a following request_review opens without delay.",
        annotations(read_only_hint = true)
    )]
    async fn is_available(&self) -> Result<CallToolResult, McpError> {
        Ok(channel::call(&self.session, Method::IsAvailable)
            .await
            .into_call_tool_result())
    }

    #[tool(
        name = "request_review",
        description = "Show the in-app review dialog. Returns once the dialog has been dismissed; it does not tell whether a review was left."
    )]
    async fn request_review(&self) -> Result<CallToolResult, McpError> {
        Ok(channel::call(&self.session, Method::RequestReview)
            .await
            .into_call_tool_result())
    }

    #[tool(
        name = "open_store_listing",
        description = "Open the app's store listing page in an external viewer."
    )]
    async fn open_store_listing(&self) -> Result<CallToolResult, McpError> {
        Ok(channel::call(&self.session, Method::OpenStoreListing)
            .await
            .into_call_tool_result())
    }

    #[tool(
        name = "request_alternate_review",
        description = "Start the alternate storefront's review flow and wait for its result, delivered through `activity_result`."
    )]
    async fn request_alternate_review(&self) -> Result<CallToolResult, McpError> {
        Ok(channel::call(&self.session, Method::RequestAlternateReview)
            .await
            .into_call_tool_result())
    }

    #[tool(
        name = "invoke",
        description = "Call a message-channel method by wire name. Unknown names reply not_implemented."
    )]
    async fn invoke(
        &self,
        Parameters(req): Parameters<InvokeRequest>,
    ) -> Result<CallToolResult, McpError> {
        if req.method.trim().is_empty() {
            return Err(McpError::invalid_params("method must not be empty", None));
        }
        Ok(channel::handle(&self.session, req.method.trim())
            .await
            .into_call_tool_result())
    }

    #[tool(
        name = "activity_result",
        description = "Deliver an activity result (request_code, result_code) from the host. Replies whether the result was consumed."
    )]
    async fn activity_result(
        &self,
        Parameters(req): Parameters<ActivityResultRequest>,
    ) -> Result<CallToolResult, McpError> {
        let handled = self
            .session
            .on_activity_result(req.request_code, req.result_code);
        Ok(MethodReply::success(handled).into_call_tool_result())
    }

    #[tool(
        name = "lifecycle",
        description = "Report a host lifecycle transition: engine attach/detach, activity attach/detach, config-change detach/reattach."
    )]
    async fn lifecycle(
        &self,
        Parameters(req): Parameters<LifecycleRequest>,
    ) -> Result<CallToolResult, McpError> {
        apply_lifecycle(&self.session, &req.transition);
        Ok(MethodReply::empty().into_call_tool_result())
    }
}

/// Feed a host lifecycle transition into the session's binding.
pub fn apply_lifecycle(session: &ReviewSession, event: &LifecycleEvent) {
    tracing::info!(event = event.as_str(), "lifecycle transition");
    let binding = session.binding();
    match event {
        LifecycleEvent::AttachedToEngine { package_id } => {
            binding.on_attached_to_engine(AppContext {
                package_id: package_id.clone(),
            });
        }
        LifecycleEvent::DetachedFromEngine => session.on_detached_from_engine(),
        LifecycleEvent::AttachedToActivity { surface_id } => {
            binding.on_attached_to_surface(Surface::new(surface_id.clone()));
        }
        LifecycleEvent::DetachedFromActivity => binding.on_detached_from_surface(),
        LifecycleEvent::DetachedForConfigChanges => binding.on_detached_for_config_changes(),
        LifecycleEvent::ReattachedForConfigChanges { surface_id } => {
            binding.on_reattached_for_config_changes(Surface::new(surface_id.clone()));
        }
    }
}

#[tool_handler]
impl ServerHandler for ReviewServer {
    fn get_info(&self) -> ServerInfo {
        ServerInfo {
            server_info: Implementation {
                name: "store-review".to_string(),
                version: env!("CARGO_PKG_VERSION").to_string(),
                ..Default::default()
            },
            instructions: Some(
                "store-review: in-app store review requests.\n\n\
                 Workflow:\n\
                 1. Call `is_available` before offering a review prompt.\n\
                 2. If true, call `request_review` at a natural pause.\n\
                 3. Otherwise `open_store_listing`, or `request_alternate_review` on devices with the alternate storefront.\n\
                 Hosts report surface changes through `lifecycle` and activity results through `activity_result`."
                    .into(),
            ),
            capabilities: ServerCapabilities::builder().enable_tools().build(),
            ..Default::default()
        }
    }
}
