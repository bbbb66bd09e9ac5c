use super::{AuthStyle, Provider};

/// Jira Cloud or Server, authenticated with basic auth.
pub struct JiraProvider;

impl Provider for JiraProvider {
    fn name(&self) -> &'static str {
        "jira"
    }

    fn display_name(&self) -> &'static str {
        "JIRA"
    }

    fn auth_style(&self) -> AuthStyle {
        AuthStyle::Basic
    }

    fn supports_proxy(&self) -> bool {
        true
    }
}
