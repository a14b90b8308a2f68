use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use axum_extra::TypedHeader;
use headers::{Authorization, authorization::Bearer};
use uuid::Uuid;

use crate::auth::hash_access_token;
use crate::error::ApiError;
use crate::models::{AppState, ROLE_ADMIN};

/// Identity of the caller, resolved from the bearer token before any handler runs.
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user_id: Uuid,
    pub role: i16,
    pub session_token_id: Uuid,
}

impl AuthContext {
    pub fn is_admin(&self) -> bool {
        self.role == ROLE_ADMIN
    }

    pub fn ensure_admin(&self) -> Result<(), ApiError> {
        if self.is_admin() {
            Ok(())
        } else {
            Err(ApiError::admin_only())
        }
    }

    /// Resolves the user a request acts on. Patients may only act on themselves.
    pub fn target_user(&self, requested: Option<Uuid>) -> Result<Uuid, ApiError> {
        match requested {
            None => Ok(self.user_id),
            Some(id) if id == self.user_id || self.is_admin() => Ok(id),
            Some(_) => Err(ApiError::Forbidden(
                "FORBIDDEN",
                "You can only act on your own account".into(),
            )),
        }
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SessionLookupRow {
    session_token_id: Uuid,
    user_id: Uuid,
    role: i16,
}

impl FromRequestParts<AppState> for AuthContext {
    type Rejection = ApiError;

    fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> impl std::future::Future<Output = Result<Self, Self::Rejection>> + Send {
        async move {
            let TypedHeader(authz): TypedHeader<Authorization<Bearer>> =
                TypedHeader::from_request_parts(parts, state)
                    .await
                    .map_err(|_| ApiError::session_expired())?;

            let token_hash = hash_access_token(authz.token());

            let row: SessionLookupRow = sqlx::query_as::<_, SessionLookupRow>(
                r#"
                SELECT st.session_token_id, st.user_id, u.role
                FROM session_token st
                JOIN users u ON u.user_id = st.user_id
                WHERE st.session_token_hash = $1
                  AND st.revoked_at IS NULL
                  AND st.expires_at > now()
                "#,
            )
            .bind(&token_hash)
            .fetch_optional(&state.db)
            .await
            .map_err(ApiError::db)?
            .ok_or_else(ApiError::session_expired)?;

            // Touch last_seen_at (best-effort)
            let _ = sqlx::query(
                r#"
                UPDATE session_token
                SET last_seen_at = now()
                WHERE session_token_id = $1
                "#,
            )
            .bind(row.session_token_id)
            .execute(&state.db)
            .await;

            Ok(AuthContext {
                user_id: row.user_id,
                role: row.role,
                session_token_id: row.session_token_id,
            })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::ROLE_PATIENT;

    fn ctx(role: i16) -> AuthContext {
        AuthContext {
            user_id: Uuid::new_v4(),
            role,
            session_token_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn test_target_user_defaults_to_caller() {
        let patient = ctx(ROLE_PATIENT);
        assert_eq!(patient.target_user(None).unwrap(), patient.user_id);
        assert_eq!(patient.target_user(Some(patient.user_id)).unwrap(), patient.user_id);
    }

    #[test]
    fn test_patient_cannot_target_others() {
        let patient = ctx(ROLE_PATIENT);
        assert!(matches!(
            patient.target_user(Some(Uuid::new_v4())),
            Err(ApiError::Forbidden(..))
        ));
        assert!(patient.ensure_admin().is_err());
    }

    #[test]
    fn test_admin_can_target_anyone() {
        let admin = ctx(ROLE_ADMIN);
        let other = Uuid::new_v4();
        assert_eq!(admin.target_user(Some(other)).unwrap(), other);
        assert!(admin.ensure_admin().is_ok());
    }
}
