//! Auth status tool definition.
//!
//! Tells a client whether the server was configured with reference
//! credentials, so it knows to call the login endpoint before using HTTP.

use futures::FutureExt;
use rmcp::{
    ErrorData as McpError,
    handler::server::tool::{ToolCallContext, ToolRoute, cached_schema_for_type},
    model::{CallToolResult, Content, Tool},
};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;

use crate::core::security::CredentialVerifier;

/// The tool takes no arguments.
#[derive(Debug, Clone, Default, Deserialize, JsonSchema)]
pub struct AuthStatusParams {}

#[derive(Debug, Clone, Serialize, JsonSchema)]
pub struct AuthStatus {
    pub login_required: bool,
}

pub struct AuthStatusTool;

impl AuthStatusTool {
    pub const NAME: &'static str = "auth_status";

    pub const DESCRIPTION: &'static str =
        "Report whether this server requires a login before files can be retrieved over HTTP.";

    pub fn execute(_params: &AuthStatusParams, credentials: &CredentialVerifier) -> CallToolResult {
        let status = AuthStatus {
            login_required: credentials.is_login_required(),
        };
        info!("Auth status requested (login required: {})", status.login_required);

        let summary = if status.login_required {
            "Login required"
        } else {
            "Login not required"
        };

        CallToolResult {
            content: vec![Content::text(summary)],
            structured_content: serde_json::to_value(&status).ok(),
            is_error: Some(false),
            meta: None,
        }
    }

    #[cfg(feature = "http")]
    pub fn http_handler(
        _arguments: serde_json::Value,
        credentials: Arc<CredentialVerifier>,
    ) -> Result<serde_json::Value, String> {
        let result = Self::execute(&AuthStatusParams::default(), &credentials);
        Ok(serde_json::json!({
            "content": result.content,
            "structuredContent": result.structured_content,
            "isError": false
        }))
    }

    pub fn to_tool() -> Tool {
        Tool {
            name: Self::NAME.into(),
            description: Some(Self::DESCRIPTION.into()),
            input_schema: cached_schema_for_type::<AuthStatusParams>(),
            annotations: None,
            output_schema: None,
            icons: None,
            meta: None,
            title: None,
        }
    }

    pub fn create_route<S>(credentials: Arc<CredentialVerifier>) -> ToolRoute<S>
    where
        S: Send + Sync + 'static,
    {
        ToolRoute::new_dyn(Self::to_tool(), move |ctx: ToolCallContext<'_, S>| {
            let args = ctx.arguments.clone().unwrap_or_default();
            let credentials = credentials.clone();
            async move {
                let params: AuthStatusParams =
                    serde_json::from_value(serde_json::Value::Object(args))
                        .map_err(|e| McpError::invalid_params(e.to_string(), None))?;
                Ok(Self::execute(&params, &credentials))
            }
            .boxed()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_required_reported() {
        let verifier = CredentialVerifier::new(Some("admin".into()), None);
        let result = AuthStatusTool::execute(&AuthStatusParams::default(), &verifier);
        assert_eq!(
            result.structured_content.unwrap()["login_required"],
            serde_json::json!(true)
        );
    }

    #[test]
    fn test_login_not_required_reported() {
        let verifier = CredentialVerifier::new(None, None);
        let result = AuthStatusTool::execute(&AuthStatusParams::default(), &verifier);
        assert_eq!(
            result.structured_content.unwrap()["login_required"],
            serde_json::json!(false)
        );
    }
}
