use axum::extract::rejection::JsonRejection;
use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crewdesk_core::PageRequest;
use crewdesk_customers::Customer;
use crewdesk_employees::Employee;
use crewdesk_jobs::Job;

use crate::app::errors::{ApiError, ApiResult};

pub const REFRESH_COOKIE: &str = "refresh_token";

// -------------------------
// Envelope
// -------------------------

#[derive(Debug, Serialize)]
pub struct Envelope<T> {
    pub success: bool,
    pub message: String,
    pub data: T,
    #[serde(rename = "statusCode")]
    pub status_code: u16,
}

pub fn success<T: Serialize>(status: StatusCode, message: impl Into<String>, data: T) -> Response {
    (
        status,
        Json(Envelope {
            success: true,
            message: message.into(),
            data,
            status_code: status.as_u16(),
        }),
    )
        .into_response()
}

/// Unwrap a JSON body, turning extractor rejections into 400s.
pub fn body<T>(payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload.map(|Json(body)| body).map_err(ApiError::from)
}

// -------------------------
// Request DTOs
// -------------------------

/// `?page=&limit=`; customer listings also accept `results_per_page`.
#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub page: Option<String>,
    pub limit: Option<String>,
    pub results_per_page: Option<String>,
}

impl ListQuery {
    pub fn page_request(&self) -> PageRequest {
        let limit = self.results_per_page.as_deref().or(self.limit.as_deref());
        PageRequest::parse(self.page.as_deref(), limit)
    }
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize, Deserialize)]
pub struct CustomerWithEmployees {
    #[serde(flatten)]
    pub customer: Customer,
    #[serde(default)]
    pub employees: Vec<Employee>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct EmployeeWithJob {
    #[serde(flatten)]
    pub employee: Employee,
    #[serde(default)]
    pub job: Option<Job>,
}

#[derive(Debug, Serialize)]
pub struct SessionTokens<'a> {
    pub token: &'a str,
    #[serde(rename = "refreshToken")]
    pub refresh_token: &'a str,
    pub customer: &'a Customer,
}

// -------------------------
// Cookies
// -------------------------

#[derive(Debug, Clone, Copy)]
pub struct CookieSettings {
    pub secure: bool,
    pub max_age_secs: i64,
}

impl CookieSettings {
    fn header(&self, value: &str, max_age_secs: i64) -> ApiResult<HeaderValue> {
        let mut cookie = format!(
            "{REFRESH_COOKIE}={value}; HttpOnly; SameSite=Strict; Path=/; Max-Age={max_age_secs}"
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie).map_err(ApiError::internal)
    }

    pub fn set_refresh(&self, response: &mut Response, refresh_token: &str) -> ApiResult<()> {
        let value = self.header(refresh_token, self.max_age_secs)?;
        response.headers_mut().append(header::SET_COOKIE, value);
        Ok(())
    }

    pub fn clear_refresh(&self, response: &mut Response) -> ApiResult<()> {
        let value = self.header("", 0)?;
        response.headers_mut().append(header::SET_COOKIE, value);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn results_per_page_takes_precedence_over_limit() {
        let query = ListQuery {
            page: Some("2".into()),
            limit: Some("5".into()),
            results_per_page: Some("1".into()),
        };
        let page = query.page_request();
        assert_eq!(page.page(), 2);
        assert_eq!(page.limit(), 1);
    }

    #[test]
    fn garbage_paging_falls_back_to_defaults() {
        let query = ListQuery {
            page: Some("first".into()),
            limit: Some("-3".into()),
            results_per_page: None,
        };
        let page = query.page_request();
        assert_eq!((page.page(), page.limit()), (1, 10));
    }

    #[test]
    fn refresh_cookie_is_http_only_and_strict() {
        let settings = CookieSettings {
            secure: true,
            max_age_secs: 604_800,
        };
        let mut response = StatusCode::OK.into_response();
        settings.set_refresh(&mut response, "abc").unwrap();
        let cookie = response.headers()[header::SET_COOKIE].to_str().unwrap();
        assert_eq!(
            cookie,
            "refresh_token=abc; HttpOnly; SameSite=Strict; Path=/; Max-Age=604800; Secure"
        );
    }
}
