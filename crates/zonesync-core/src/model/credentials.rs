// # Credential Descriptors
//
// Tagged description of how an account authenticates against the provider.
// Turning a descriptor into a signed session is the job of a
// `RemoteClientFactory`; the core only carries the data.

use serde::{Deserialize, Serialize};

/// How an account obtains provider credentials
///
/// Serialized with a `type` tag, e.g. `{"type": "profile", "name": "prod"}`.
/// Unknown tags are rejected at deserialization time.
#[derive(Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum CredentialKind {
    /// Named profile from the shared credentials file
    Profile {
        /// Profile name
        name: String,
    },

    /// Static access key pair
    AccessKey {
        /// Access key id
        access_key_id: String,
        /// Secret access key
        /// ⚠️ NEVER log this value
        secret_access_key: String,
        /// Optional session token for temporary credentials
        #[serde(default)]
        session_token: Option<String>,
    },

    /// Role assumed through STS
    AssumeRole {
        /// Role ARN
        role_arn: String,
        /// Session name
        #[serde(default)]
        session_name: Option<String>,
        /// External id required by the role trust policy
        #[serde(default)]
        external_id: Option<String>,
    },

    /// Web identity token exchanged through STS
    WebIdentity {
        /// Role ARN
        role_arn: String,
        /// Path to the OIDC token file
        token_file: String,
    },

    /// Instance metadata credentials
    InstanceProfile,

    /// Standard `AWS_*` environment variables
    #[default]
    Env,
}

impl CredentialKind {
    /// Stable type name, matching the serde tag
    pub fn type_name(&self) -> &'static str {
        match self {
            CredentialKind::Profile { .. } => "profile",
            CredentialKind::AccessKey { .. } => "access_key",
            CredentialKind::AssumeRole { .. } => "assume_role",
            CredentialKind::WebIdentity { .. } => "web_identity",
            CredentialKind::InstanceProfile => "instance_profile",
            CredentialKind::Env => "env",
        }
    }

    /// Validate the descriptor's own fields
    pub fn validate(&self) -> Result<(), crate::Error> {
        match self {
            CredentialKind::Profile { name } if name.trim().is_empty() => {
                Err(crate::Error::config("Credential profile name cannot be empty"))
            }
            CredentialKind::AccessKey {
                access_key_id,
                secret_access_key,
                ..
            } => {
                if access_key_id.is_empty() || secret_access_key.is_empty() {
                    return Err(crate::Error::config(
                        "Access key credentials require both key id and secret",
                    ));
                }
                Ok(())
            }
            CredentialKind::AssumeRole { role_arn, .. }
            | CredentialKind::WebIdentity { role_arn, .. }
                if !role_arn.starts_with("arn:") =>
            {
                Err(crate::Error::config(format!(
                    "Invalid role ARN: {}",
                    role_arn
                )))
            }
            _ => Ok(()),
        }
    }
}

// Custom Debug implementation that hides secrets
impl std::fmt::Debug for CredentialKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CredentialKind::Profile { name } => {
                f.debug_struct("Profile").field("name", name).finish()
            }
            CredentialKind::AccessKey {
                access_key_id,
                session_token,
                ..
            } => f
                .debug_struct("AccessKey")
                .field("access_key_id", access_key_id)
                .field("secret_access_key", &"<REDACTED>")
                .field(
                    "session_token",
                    &session_token.as_ref().map(|_| "<REDACTED>"),
                )
                .finish(),
            CredentialKind::AssumeRole {
                role_arn,
                session_name,
                external_id,
            } => f
                .debug_struct("AssumeRole")
                .field("role_arn", role_arn)
                .field("session_name", session_name)
                .field("external_id", &external_id.as_ref().map(|_| "<REDACTED>"))
                .finish(),
            CredentialKind::WebIdentity {
                role_arn,
                token_file,
            } => f
                .debug_struct("WebIdentity")
                .field("role_arn", role_arn)
                .field("token_file", token_file)
                .finish(),
            CredentialKind::InstanceProfile => f.write_str("InstanceProfile"),
            CredentialKind::Env => f.write_str("Env"),
        }
    }
}
