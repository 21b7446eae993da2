//! Master/domain password rules
//!
//! The master password protects the domain keystore. It may be omitted, in
//! which case the administrative password is reused, but whichever value ends
//! up being used must be longer than [`MIN_MASTER_PASSWORD_LEN`] characters.

use crate::error::{CoreError, Result};
use crate::model::DomainSpec;
use secrecy::{ExposeSecret, SecretString};

/// Master passwords must be strictly longer than this.
pub const MIN_MASTER_PASSWORD_LEN: usize = 6;

/// Pick the master password, falling back to the domain password only when
/// no master password was given at all.
pub fn resolve_master_password(
    explicit_master: Option<&SecretString>,
    domain_password: Option<&SecretString>,
) -> Result<SecretString> {
    match explicit_master {
        Some(master) if long_enough(master) => Ok(master.clone()),
        Some(_) => Err(CoreError::MasterPasswordTooShort {
            min: MIN_MASTER_PASSWORD_LEN,
        }),
        None => match domain_password {
            Some(password) if long_enough(password) => Ok(password.clone()),
            _ => Err(CoreError::MasterPasswordUnspecified {
                min: MIN_MASTER_PASSWORD_LEN,
            }),
        },
    }
}

/// [`resolve_master_password`] applied to a spec.
pub fn master_password_for(spec: &DomainSpec) -> Result<SecretString> {
    resolve_master_password(spec.master_password.as_ref(), spec.password.as_ref())
}

fn long_enough(secret: &SecretString) -> bool {
    secret.expose_secret().chars().count() > MIN_MASTER_PASSWORD_LEN
}

/// The password file is only written when there is a plaintext password to put in it.
pub fn needs_password_file(spec: &DomainSpec) -> bool {
    spec.password_file.is_some() && spec.password.is_some()
}

/// Content of an asadmin password file.
pub fn password_file_content(password: &SecretString, master: &SecretString) -> SecretString {
    SecretString::new(format!(
        "AS_ADMIN_PASSWORD={}\nAS_ADMIN_MASTERPASSWORD={}\n",
        password.expose_secret(),
        master.expose_secret()
    ))
}
