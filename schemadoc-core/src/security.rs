//! Credential container with automatic memory zeroing.
//!
//! Username and password live in `Zeroizing` buffers that are cleared when
//! the credentials go out of scope. `Debug` output never shows the password.

use zeroize::Zeroizing;

/// Database login supplied through configuration rather than the URL.
///
/// # Example
///
/// ```rust
/// use schemadoc_core::security::Credentials;
///
/// let creds = Credentials::new(Some("admin".to_string()), Some("secret".to_string()));
/// assert_eq!(creds.username(), Some("admin"));
/// assert!(creds.has_password());
/// assert!(!format!("{:?}", creds).contains("secret"));
/// ```
#[derive(Clone, Default)]
pub struct Credentials {
    username: Zeroizing<Option<String>>,
    password: Zeroizing<Option<String>>,
}

impl Credentials {
    /// Creates credentials; both parts are optional because a URL may carry
    /// its own user and password.
    pub fn new(username: Option<String>, password: Option<String>) -> Self {
        Self {
            username: Zeroizing::new(username.filter(|u| !u.is_empty())),
            password: Zeroizing::new(password),
        }
    }

    /// Gets the username, if one was configured.
    pub fn username(&self) -> Option<&str> {
        self.username.as_deref()
    }

    /// Gets the password for handing to the driver.
    ///
    /// # Security
    /// Callers must pass the value straight to connect options and never log it.
    pub fn password(&self) -> Option<&str> {
        self.password.as_deref()
    }

    /// Checks if password is present without exposing it.
    pub fn has_password(&self) -> bool {
        self.password.is_some()
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username())
            .field("password", &self.password.as_ref().map(|_| "****"))
            .finish()
    }
}
