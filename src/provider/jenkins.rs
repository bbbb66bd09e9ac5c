use super::{AuthStyle, Provider};

pub struct JenkinsProvider;

impl Provider for JenkinsProvider {
    fn name(&self) -> &'static str {
        "jenkins"
    }

    fn display_name(&self) -> &'static str {
        "Jenkins"
    }

    fn auth_style(&self) -> AuthStyle {
        AuthStyle::Basic
    }

    // Jenkins connections are reached directly, never through a proxy.
    fn supports_proxy(&self) -> bool {
        false
    }

    fn connection_limit(&self) -> Option<usize> {
        Some(1)
    }
}
