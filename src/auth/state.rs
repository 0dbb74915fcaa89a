//! Authentication state traits and macro.

use std::time::Duration;

use crate::db::Database;
use crate::jwt::JwtConfig;

/// Trait for state types that provide what the authentication gate needs:
/// the token codec, the identity store, and the lookup budget.
pub trait HasAuthState {
    fn jwt(&self) -> &JwtConfig;
    fn db(&self) -> &Database;
    /// Budget for identity-store lookups. A store that stalls past this
    /// budget is treated as an upstream failure instead of hanging the
    /// request.
    fn lookup_timeout(&self) -> Duration;
}

/// Macro to implement `HasAuthState` for state structs with the standard
/// fields.
///
/// The struct must have these fields:
/// - `jwt: Arc<JwtConfig>`
/// - `db: Database`
/// - `lookup_timeout: Duration`
#[macro_export]
macro_rules! impl_has_auth_state {
    ($state_type:ty) => {
        impl $crate::auth::HasAuthState for $state_type {
            fn jwt(&self) -> &$crate::jwt::JwtConfig {
                &self.jwt
            }
            fn db(&self) -> &$crate::db::Database {
                &self.db
            }
            fn lookup_timeout(&self) -> std::time::Duration {
                self.lookup_timeout
            }
        }
    };
}
