use super::{AuthStyle, Provider};

/// GitLab.com or self-managed GitLab, authenticated with an access token.
pub struct GitlabProvider;

impl Provider for GitlabProvider {
    fn name(&self) -> &'static str {
        "gitlab"
    }

    fn display_name(&self) -> &'static str {
        "GitLab"
    }

    fn auth_style(&self) -> AuthStyle {
        AuthStyle::Token
    }

    fn supports_proxy(&self) -> bool {
        true
    }

    fn legacy_token_alias(&self) -> Option<&'static str> {
        Some("auth")
    }
}
