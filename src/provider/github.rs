use super::{AuthStyle, Provider};

/// GitHub, authenticated with one or more personal access tokens.
pub struct GithubProvider;

impl Provider for GithubProvider {
    fn name(&self) -> &'static str {
        "github"
    }

    fn display_name(&self) -> &'static str {
        "GitHub"
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
