//! Action dispatch for the admin JSON endpoint
//!
//! A request is a JSON object `{"action": ..., "nonce": ..., ...params}`.
//! The answer is always the `{success, data}` envelope; failures carry
//! `data.message`.

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use tracing::{info, warn};

use crate::auth::AccessPolicy;
use crate::controller::AutomationController;
use crate::directives::{Directive, DirectiveBook};
use crate::error::{AutomationError, AutomationResult};
use crate::runtime::format_runtime;
use crate::types::{Component, Toggle};

/// Every action name the endpoint understands
pub const ACTIONS: &[&str] = &[
    "toggle_automation",
    "get_automation_status",
    "get_process_health",
    "clear_process_errors",
    "get_directives",
    "save_directive",
    "delete_directive",
];

#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum AjaxRequest {
    ToggleAutomation { component: String, toggle: Toggle },
    GetAutomationStatus,
    GetProcessHealth,
    ClearProcessErrors { component: String },
    GetDirectives,
    SaveDirective { directive: Directive },
    DeleteDirective { id: String },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AjaxResponse {
    pub success: bool,
    pub data: Value,
}

impl AjaxResponse {
    pub fn success(data: Value) -> Self {
        Self {
            success: true,
            data,
        }
    }

    pub fn error(message: impl Into<String>) -> Self {
        Self {
            success: false,
            data: json!({ "message": message.into() }),
        }
    }
}

impl From<AutomationError> for AjaxResponse {
    fn from(e: AutomationError) -> Self {
        AjaxResponse::error(e.to_string())
    }
}

/// Authorize, decode and run one request
pub async fn handle_request(
    controller: &AutomationController,
    policy: &AccessPolicy,
    bearer: Option<&str>,
    body: Value,
) -> AjaxResponse {
    match authorize_and_dispatch(controller, policy, bearer, body).await {
        Ok(data) => AjaxResponse::success(data),
        Err(e) => {
            warn!("Action failed: {}", e);
            e.into()
        }
    }
}

async fn authorize_and_dispatch(
    controller: &AutomationController,
    policy: &AccessPolicy,
    bearer: Option<&str>,
    body: Value,
) -> AutomationResult<Value> {
    let action = body
        .get("action")
        .and_then(Value::as_str)
        .ok_or_else(|| AutomationError::InvalidAction("missing".into()))?
        .to_string();
    let nonce = body.get("nonce").and_then(Value::as_str);

    policy.authorize(bearer, &action, nonce)?;

    if !ACTIONS.contains(&action.as_str()) {
        return Err(AutomationError::InvalidAction(action));
    }
    if matches!(action.as_str(), "toggle_automation" | "clear_process_errors")
        && body.get("component").and_then(Value::as_str).is_none()
    {
        return Err(AutomationError::InvalidComponent("missing".into()));
    }
    // Decoder text stays in the log, not in the response
    let request: AjaxRequest = serde_json::from_value(body).map_err(|e| {
        warn!(action = %action, "Malformed parameters: {}", e);
        AutomationError::InvalidAction(action.clone())
    })?;

    dispatch(controller, request).await
}

/// Run an already-authorized request
pub async fn dispatch(
    controller: &AutomationController,
    request: AjaxRequest,
) -> AutomationResult<Value> {
    match request {
        AjaxRequest::ToggleAutomation { component, toggle } => {
            let component: Component = component.parse()?;
            let state = controller.toggle(component, toggle).await?;
            info!(%component, ?toggle, "Automation toggled");

            Ok(json!({
                "component": component,
                "status": state.status,
                "start_time": state.start_time,
                "runtime": format_runtime(controller.now(), state.start_time, state.is_running()),
                "message": format!("{} {}", component, state.status.as_str()),
            }))
        }
        AjaxRequest::GetAutomationStatus => Ok(json!({
            "components": controller.all_statuses().await?,
            "coordinated": controller.is_coordinated().await?,
        })),
        AjaxRequest::GetProcessHealth => Ok(json!({
            "data_import": controller.health_snapshot(Component::DataImport).await?,
            "scoring": controller.health_snapshot(Component::Scoring).await?,
            "overall": controller.overall_health().await?,
            "coordinated": controller.is_coordinated().await?,
        })),
        AjaxRequest::ClearProcessErrors { component } => {
            let component: Component = component.parse()?;
            let cleared = controller.clear_errors(component).await?;
            Ok(json!({ "component": component, "cleared": cleared }))
        }
        AjaxRequest::GetDirectives => {
            let directives = DirectiveBook::new(controller.store().as_ref()).list().await?;
            Ok(json!({ "directives": directives }))
        }
        AjaxRequest::SaveDirective { directive } => {
            let directives = DirectiveBook::new(controller.store().as_ref())
                .save(directive)
                .await?;
            Ok(json!({ "directives": directives }))
        }
        AjaxRequest::DeleteDirective { id } => {
            let deleted = DirectiveBook::new(controller.store().as_ref())
                .delete(&id)
                .await?;
            Ok(json!({ "id": id, "deleted": deleted }))
        }
    }
}
