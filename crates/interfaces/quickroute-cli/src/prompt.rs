use async_trait::async_trait;
use tokio::io::{AsyncBufReadExt, BufReader};
use tracing::debug;

use quickroute_app_core::{Credential, CredentialPrompt, ServiceAction};

/// Uses a preset credential, or reads one line from stdin when allowed.
pub struct CliPrompt {
    preset: Option<Credential>,
    interactive: bool,
}

impl CliPrompt {
    pub fn new(preset: Option<String>, interactive: bool) -> Self {
        Self {
            preset: preset.filter(|s| !s.is_empty()).map(Credential::new),
            interactive,
        }
    }
}

#[async_trait]
impl CredentialPrompt for CliPrompt {
    async fn request_credential(&self, action: ServiceAction) -> Option<Credential> {
        if let Some(credential) = &self.preset {
            return Some(credential.clone());
        }
        if !self.interactive {
            debug!(?action, "no credential and no terminal, treating as dismissed");
            return None;
        }

        let verb = match action {
            ServiceAction::Install => "install",
            ServiceAction::Uninstall => "uninstall",
        };
        eprint!("Password to {verb} the service (empty to cancel): ");

        let mut line = String::new();
        let mut reader = BufReader::new(tokio::io::stdin());
        match reader.read_line(&mut line).await {
            Ok(0) | Err(_) => None,
            Ok(_) => {
                let secret = line.trim_end_matches(['\r', '\n']);
                (!secret.is_empty()).then(|| Credential::new(secret))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn preset_credential_wins() {
        let prompt = CliPrompt::new(Some("pw".into()), false);
        let got = prompt.request_credential(ServiceAction::Install).await;
        assert_eq!(got.map(|c| c.expose().to_string()), Some("pw".into()));
    }

    #[tokio::test]
    async fn non_interactive_without_preset_dismisses() {
        let prompt = CliPrompt::new(Some(String::new()), false);
        assert!(prompt
            .request_credential(ServiceAction::Uninstall)
            .await
            .is_none());
    }
}
