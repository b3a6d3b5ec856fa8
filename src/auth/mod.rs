//! Token issuance, verification and the session lifecycle around them.

pub mod clock;
pub mod credentials;
pub mod guard;
pub mod password;
pub mod session;
pub mod store;
pub mod token;

pub use self::credentials::{Credential, CredentialSet, Role};
pub use self::guard::{Deny, Guard};
pub use self::session::{SessionError, SessionManager};
pub use self::token::{TokenCodec, TokenPair};
