use schemars::JsonSchema;
use serde::Deserialize;

/// Call any method on the message boundary by its wire name.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct InvokeRequest {
    /// Method name: isAvailable, requestReview, openStoreListing or requestAlternateReview.
    pub method: String,
}

/// Activity result reported by the host once an external review UI closes.
#[derive(Debug, Deserialize, JsonSchema)]
pub struct ActivityResultRequest {
    /// Correlation code the activity was started with (1001 for the alternate review).
    pub request_code: i32,
    /// Result code reported by the activity.
    pub result_code: i32,
}

/// Host lifecycle transition.
#[derive(Debug, Clone, Deserialize, JsonSchema, PartialEq, Eq)]
#[serde(tag = "event", rename_all = "snake_case")]
pub enum LifecycleEvent {
    AttachedToEngine { package_id: String },
    DetachedFromEngine,
    AttachedToActivity { surface_id: String },
    DetachedFromActivity,
    DetachedForConfigChanges,
    ReattachedForConfigChanges { surface_id: String },
}

impl LifecycleEvent {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AttachedToEngine { .. } => "attached_to_engine",
            Self::DetachedFromEngine => "detached_from_engine",
            Self::AttachedToActivity { .. } => "attached_to_activity",
            Self::DetachedFromActivity => "detached_from_activity",
            Self::DetachedForConfigChanges => "detached_for_config_changes",
            Self::ReattachedForConfigChanges { .. } => "reattached_for_config_changes",
        }
    }
}

#[derive(Debug, Deserialize, JsonSchema)]
pub struct LifecycleRequest {
    pub transition: LifecycleEvent,
}
