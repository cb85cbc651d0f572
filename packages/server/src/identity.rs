//! Caller identity from gateway headers.
//!
//! Credentials are verified upstream; the gateway forwards the verified
//! identity as `X-User-Id`, `X-User-Role` and (for authorities)
//! `X-User-Sector`.

use actix_web::HttpRequest;
use alerta_report_models::{Identity, Role, Sector};

use crate::error::ApiError;

pub const USER_ID_HEADER: &str = "X-User-Id";
pub const USER_ROLE_HEADER: &str = "X-User-Role";
pub const USER_SECTOR_HEADER: &str = "X-User-Sector";

fn header<'a>(req: &'a HttpRequest, name: &str) -> Option<&'a str> {
    req.headers()
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
}

/// Reads the caller's identity.
///
/// # Errors
///
/// Returns [`ApiError::Unauthorized`] if the id or role header is missing
/// or the role or sector is unknown.
pub fn caller(req: &HttpRequest) -> Result<Identity, ApiError> {
    let id = header(req, USER_ID_HEADER)
        .ok_or_else(|| ApiError::unauthorized("Missing identity"))?;
    let role: Role = header(req, USER_ROLE_HEADER)
        .ok_or_else(|| ApiError::unauthorized("Missing role"))?
        .parse()
        .map_err(|_| ApiError::unauthorized("Unknown role"))?;
    let sector: Option<Sector> = header(req, USER_SECTOR_HEADER)
        .map(|s| {
            s.parse()
                .map_err(|_| ApiError::unauthorized(format!("Unknown sector '{s}'")))
        })
        .transpose()?;

    Ok(Identity {
        id: id.to_string(),
        role,
        sector: if role == Role::Authority { sector } else { None },
    })
}

#[cfg(test)]
mod tests {
    use actix_web::test::TestRequest;

    use super::*;

    #[test]
    fn reads_authority_with_sector() {
        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, "a-1"))
            .insert_header((USER_ROLE_HEADER, "authority"))
            .insert_header((USER_SECTOR_HEADER, "security"))
            .to_http_request();

        let identity = caller(&req).unwrap();
        assert_eq!(identity, Identity::authority("a-1", Sector::Security));
    }

    #[test]
    fn sector_is_dropped_for_non_authorities() {
        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, "s-1"))
            .insert_header((USER_ROLE_HEADER, "student"))
            .insert_header((USER_SECTOR_HEADER, "Security"))
            .to_http_request();

        assert_eq!(caller(&req).unwrap(), Identity::student("s-1"));
    }

    #[test]
    fn missing_or_unknown_headers_are_unauthorized() {
        let req = TestRequest::default().to_http_request();
        assert!(matches!(caller(&req), Err(ApiError::Unauthorized { .. })));

        let req = TestRequest::default()
            .insert_header((USER_ID_HEADER, "x"))
            .insert_header((USER_ROLE_HEADER, "janitor"))
            .to_http_request();
        assert!(matches!(caller(&req), Err(ApiError::Unauthorized { .. })));
    }
}
