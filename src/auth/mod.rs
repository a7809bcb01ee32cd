use actix_web::{web, HttpRequest};
use diesel::prelude::*;
use uuid::Uuid;

use crate::database::DbPool;
use crate::errors::ServiceError;
use crate::models::User;
use crate::schema::users;

/// Resolved caller identity. Accounts are provisioned externally; this module
/// only resolves a bearer token to a row in the users table.
#[derive(Debug, Clone, Copy)]
pub struct Identity {
    pub user_id: Uuid,
    pub is_admin: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Action {
    Read,
    Write,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resource {
    Stations,
    Routes,
    TrainTypes,
    Trains,
    Crew,
    Trips,
    Orders,
}

/// Single authorization decision point, called at the top of every handler.
pub fn can_perform(identity: &Identity, action: Action, resource: Resource) -> bool {
    match (resource, action) {
        // orders are scoped to the owner by the queries themselves
        (Resource::Orders, _) => true,
        (_, Action::Read) => true,
        (_, Action::Write) => identity.is_admin,
    }
}

pub fn require(
    identity: &Identity,
    action: Action,
    resource: Resource,
) -> Result<(), ServiceError> {
    if can_perform(identity, action, resource) {
        Ok(())
    } else {
        Err(ServiceError::Forbidden)
    }
}

fn bearer_token(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get("Authorization")?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
        .map(|token| token.trim().to_owned())
}

/// Resolves the request credentials against the users table.
pub async fn authenticate(
    pool: &web::Data<DbPool>,
    req: &HttpRequest,
) -> Result<Identity, ServiceError> {
    let token = bearer_token(req).ok_or(ServiceError::Unauthorized)?;
    let pool = pool.clone();

    let user = web::block(move || -> Result<User, ServiceError> {
        let mut conn = pool.get()?;
        users::table
            .filter(users::token.eq(token))
            .first::<User>(&mut conn)
            .optional()?
            .ok_or(ServiceError::Unauthorized)
    })
    .await??;

    Ok(Identity {
        user_id: user.id,
        is_admin: user.is_admin,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use actix_web::test::TestRequest;

    fn user() -> Identity {
        Identity {
            user_id: Uuid::new_v4(),
            is_admin: false,
        }
    }

    fn admin() -> Identity {
        Identity {
            user_id: Uuid::new_v4(),
            is_admin: true,
        }
    }

    #[test]
    fn authenticated_users_can_read_reference_data() {
        for resource in [
            Resource::Stations,
            Resource::Routes,
            Resource::TrainTypes,
            Resource::Trains,
            Resource::Crew,
            Resource::Trips,
        ] {
            assert!(can_perform(&user(), Action::Read, resource));
            assert!(!can_perform(&user(), Action::Write, resource));
        }
    }

    #[test]
    fn admins_can_mutate_reference_data() {
        for resource in [
            Resource::Stations,
            Resource::Routes,
            Resource::TrainTypes,
            Resource::Trains,
            Resource::Crew,
            Resource::Trips,
        ] {
            assert!(can_perform(&admin(), Action::Write, resource));
        }
    }

    #[test]
    fn any_authenticated_user_can_use_orders() {
        assert!(can_perform(&user(), Action::Read, Resource::Orders));
        assert!(can_perform(&user(), Action::Write, Resource::Orders));
    }

    #[test]
    fn require_turns_denial_into_forbidden() {
        assert!(require(&user(), Action::Write, Resource::Trips).is_err());
        assert!(require(&admin(), Action::Write, Resource::Trips).is_ok());
    }

    #[test]
    fn bearer_token_extraction() {
        let req = TestRequest::default()
            .insert_header(("Authorization", "Bearer abc123"))
            .to_http_request();
        assert_eq!(bearer_token(&req), Some("abc123".to_string()));

        let req = TestRequest::default().to_http_request();
        assert_eq!(bearer_token(&req), None);

        let req = TestRequest::default()
            .insert_header(("Authorization", "Basic abc123"))
            .to_http_request();
        assert_eq!(bearer_token(&req), None);
    }
}
