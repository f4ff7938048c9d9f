//! Startup tasks: signing key loading and client bootstrap.

use std::fs;

use anyhow::{Context, bail};
use studio_auth::config::SigningConfig;
use studio_auth::oauth::ClientRegistration;
use studio_auth::{ClientStorage, SigningKeyPair};
use tracing::{info, warn};

use crate::config::BootstrapClient;

/// Loads the RS256 signing keypair.
///
/// Inline PEMs win over key files. Without either, an ephemeral keypair is
/// generated when `allow_ephemeral` is set.
pub fn load_signing_key(cfg: &SigningConfig) -> anyhow::Result<SigningKeyPair> {
    let private_pem = match (&cfg.private_key_pem, &cfg.private_key_path) {
        (Some(pem), _) => Some(pem.clone()),
        (None, Some(path)) => Some(
            fs::read_to_string(path)
                .with_context(|| format!("reading private key {}", path.display()))?,
        ),
        (None, None) => None,
    };
    let public_pem = match (&cfg.public_key_pem, &cfg.public_key_path) {
        (Some(pem), _) => Some(pem.clone()),
        (None, Some(path)) => Some(
            fs::read_to_string(path)
                .with_context(|| format!("reading public key {}", path.display()))?,
        ),
        (None, None) => None,
    };

    match (private_pem, public_pem) {
        (Some(private_pem), Some(public_pem)) => {
            let key = SigningKeyPair::from_pem(&cfg.key_id, &private_pem, &public_pem)
                .context("parsing signing keypair")?;
            info!(kid = %cfg.key_id, "Loaded signing key");
            Ok(key)
        }
        (None, None) if cfg.allow_ephemeral => {
            warn!(
                kid = %cfg.key_id,
                "No signing key configured, generating an ephemeral keypair; issued tokens will not survive a restart"
            );
            SigningKeyPair::generate_rsa(&cfg.key_id).context("generating ephemeral keypair")
        }
        (None, None) => bail!(
            "no signing key configured; set auth.signing.private_key_pem/public_key_pem, \
             the *_path variants, or auth.signing.allow_ephemeral = true"
        ),
        _ => bail!("both the private and the public signing key must be configured"),
    }
}

/// Creates or updates the configured clients.
///
/// Existing clients keep their `created_at`; every other field, the secret
/// included, is replaced with the configured value.
pub async fn bootstrap_clients(
    clients: &[BootstrapClient],
    storage: &dyn ClientStorage,
) -> anyhow::Result<()> {
    for entry in clients {
        let registered = ClientRegistration {
            id: Some(entry.id.clone()),
            secret: Some(entry.secret.clone()),
            name: entry.name.clone(),
            website_url: entry.website_url.clone(),
            preview_url_pattern: entry.preview_url_pattern.clone(),
            owner_id: entry.owner_id,
        }
        .build()
        .with_context(|| format!("client {} is invalid", entry.id))?;
        let mut client = registered.client;

        match storage.find_by_id(&client.id).await? {
            Some(existing) => {
                client.created_at = existing.created_at;
                storage.update(&client).await?;
                info!(client_id = %client.id, website = %client.website_url, "Updated bootstrap client");
            }
            None => {
                storage.create(&client).await?;
                info!(client_id = %client.id, website = %client.website_url, "Created bootstrap client");
            }
        }
    }
    Ok(())
}
