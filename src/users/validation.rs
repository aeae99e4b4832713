//! Field rules for user input. Runs before any business logic and never
//! touches storage. Every violation is collected, not just the first.

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::error::{AppError, AppResult, FieldError};
use crate::users::dto::{ListParams, NewUserPayload, Patch, UpdateUserPayload, UserCreate, UserUpdate};
use crate::users::repo_types::ListFilter;

pub const USERNAME_MIN_LEN: usize = 3;
pub const USERNAME_MAX_LEN: usize = 50;
pub const PASSWORD_MIN_LEN: usize = 8;
pub const LIMIT_DEFAULT: i64 = 10;
pub const LIMIT_MAX: i64 = 100;

pub(crate) fn is_valid_email(email: &str) -> bool {
    lazy_static! {
        static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").unwrap();
    }
    EMAIL_RE.is_match(email)
}

struct Violations {
    scope: &'static str,
    errors: Vec<FieldError>,
}

impl Violations {
    fn new(scope: &'static str) -> Self {
        Self {
            scope,
            errors: Vec::new(),
        }
    }

    fn push(&mut self, field: &str, message: impl Into<String>) {
        self.errors
            .push(FieldError::new(format!("{}.{}", self.scope, field), message));
    }

    fn required<T>(&mut self, field: &str, value: Option<T>) -> Option<T> {
        if value.is_none() {
            self.push(field, "field required");
        }
        value
    }

    fn non_null<T>(&mut self, field: &str, value: Patch<T>) -> Option<T> {
        match value {
            Patch::Unset => None,
            Patch::Null => {
                self.push(field, "may not be null");
                None
            }
            Patch::Value(v) => Some(v),
        }
    }

    fn string(&mut self, field: &str, raw: Value) -> Option<String> {
        match raw {
            Value::String(s) => Some(s),
            _ => {
                self.push(field, "str type expected");
                None
            }
        }
    }

    fn boolean(&mut self, field: &str, raw: Value) -> Option<bool> {
        match raw {
            Value::Bool(b) => Some(b),
            _ => {
                self.push(field, "value could not be parsed to a boolean");
                None
            }
        }
    }

    /// Query values arrive as text. Absent keys fall back to `default`.
    fn query_integer(&mut self, field: &str, raw: Option<&str>, default: i64) -> Option<i64> {
        let Some(raw) = raw else {
            return Some(default);
        };
        let parsed = raw.trim().parse::<i64>().ok();
        if parsed.is_none() {
            self.push(field, "value is not a valid integer");
        }
        parsed
    }

    fn query_boolean(&mut self, field: &str, raw: Option<&str>) -> Option<bool> {
        let raw = raw?;
        let parsed = match raw.trim().to_ascii_lowercase().as_str() {
            "true" | "1" | "yes" | "on" => Some(true),
            "false" | "0" | "no" | "off" => Some(false),
            _ => None,
        };
        if parsed.is_none() {
            self.push(field, "value could not be parsed to a boolean");
        }
        parsed
    }

    fn email(&mut self, field: &str, email: &str) {
        if !is_valid_email(email) {
            self.push(field, "value is not a valid email address");
        }
    }

    fn username(&mut self, field: &str, username: &str) {
        let len = username.chars().count();
        if len < USERNAME_MIN_LEN {
            self.push(
                field,
                format!("ensure this value has at least {USERNAME_MIN_LEN} characters"),
            );
        } else if len > USERNAME_MAX_LEN {
            self.push(
                field,
                format!("ensure this value has at most {USERNAME_MAX_LEN} characters"),
            );
        }
    }

    fn password(&mut self, field: &str, password: &str) {
        if password.chars().count() < PASSWORD_MIN_LEN {
            self.push(
                field,
                format!("ensure this value has at least {PASSWORD_MIN_LEN} characters"),
            );
        }
    }

    fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    fn into_error(self) -> AppError {
        AppError::Validation(self.errors)
    }
}

impl NewUserPayload {
    pub fn validate(self) -> AppResult<UserCreate> {
        let mut v = Violations::new("user");

        let email = v
            .required("email", self.email)
            .and_then(|raw| v.string("email", raw))
            .map(|e| e.trim().to_string());
        if let Some(email) = &email {
            v.email("email", email);
        }
        let username = v
            .required("username", self.username)
            .and_then(|raw| v.string("username", raw));
        if let Some(username) = &username {
            v.username("username", username);
        }
        let full_name = self
            .full_name
            .and_then(|raw| v.string("full_name", raw));
        let is_active = self
            .is_active
            .and_then(|raw| v.boolean("is_active", raw))
            .unwrap_or(true);
        let password = v
            .required("password", self.password)
            .and_then(|raw| v.string("password", raw));
        if let Some(password) = &password {
            v.password("password", password);
        }

        match (email, username, password) {
            (Some(email), Some(username), Some(password)) if v.is_empty() => Ok(UserCreate {
                email,
                username,
                full_name,
                is_active,
                password,
            }),
            _ => Err(v.into_error()),
        }
    }
}

impl UpdateUserPayload {
    pub fn validate(self) -> AppResult<UserUpdate> {
        let mut v = Violations::new("user");

        let email = v
            .non_null("email", self.email)
            .and_then(|raw| v.string("email", raw))
            .map(|e| e.trim().to_string());
        if let Some(email) = &email {
            v.email("email", email);
        }
        let username = v
            .non_null("username", self.username)
            .and_then(|raw| v.string("username", raw));
        if let Some(username) = &username {
            v.username("username", username);
        }
        let full_name = match self.full_name {
            Patch::Unset => Patch::Unset,
            Patch::Null => Patch::Null,
            Patch::Value(raw) => v
                .string("full_name", raw)
                .map_or(Patch::Unset, Patch::Value),
        };
        let is_active = v
            .non_null("is_active", self.is_active)
            .and_then(|raw| v.boolean("is_active", raw));

        if !v.is_empty() {
            return Err(v.into_error());
        }
        Ok(UserUpdate {
            email,
            username,
            full_name,
            is_active,
        })
    }
}

impl ListParams {
    pub fn validate(self) -> AppResult<ListFilter> {
        let mut v = Violations::new("query");

        let skip = v.query_integer("skip", self.skip.as_deref(), 0);
        if skip.is_some_and(|skip| skip < 0) {
            v.push("skip", "ensure this value is greater than or equal to 0");
        }
        let limit = v.query_integer("limit", self.limit.as_deref(), LIMIT_DEFAULT);
        if limit.is_some_and(|limit| !(1..=LIMIT_MAX).contains(&limit)) {
            v.push(
                "limit",
                format!("ensure this value is between 1 and {LIMIT_MAX}"),
            );
        }
        let is_active = v.query_boolean("is_active", self.is_active.as_deref());

        match (skip, limit) {
            (Some(skip), Some(limit)) if v.is_empty() => Ok(ListFilter {
                skip,
                limit,
                is_active,
            }),
            _ => Err(v.into_error()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn payload() -> NewUserPayload {
        NewUserPayload {
            email: Some(json!("a@x.com")),
            username: Some(json!("alice")),
            full_name: None,
            is_active: None,
            password: Some(json!("longenough")),
        }
    }

    fn query(skip: Option<&str>, limit: Option<&str>, is_active: Option<&str>) -> ListParams {
        ListParams {
            skip: skip.map(Into::into),
            limit: limit.map(Into::into),
            is_active: is_active.map(Into::into),
        }
    }

    fn fields(err: AppError) -> Vec<String> {
        match err {
            AppError::Validation(errors) => errors.into_iter().map(|e| e.field).collect(),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn email_syntax() {
        assert!(is_valid_email("user@example.com"));
        assert!(is_valid_email("first.last+tag@sub.example.org"));
        assert!(!is_valid_email("userexample.com"));
        assert!(!is_valid_email("user@localhost"));
        assert!(!is_valid_email("us er@example.com"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn create_defaults_is_active_to_true() {
        let user = payload().validate().unwrap();
        assert!(user.is_active);
        assert_eq!(user.email, "a@x.com");
        assert_eq!(user.full_name, None);
    }

    #[test]
    fn create_trims_email() {
        let mut p = payload();
        p.email = Some(json!("  a@x.com "));
        assert_eq!(p.validate().unwrap().email, "a@x.com");
    }

    #[test]
    fn create_keeps_optional_fields() {
        let mut p = payload();
        p.full_name = Some(json!("Alice Liddell"));
        p.is_active = Some(json!(false));
        let user = p.validate().unwrap();
        assert_eq!(user.full_name.as_deref(), Some("Alice Liddell"));
        assert!(!user.is_active);
    }

    #[test]
    fn create_reports_every_failing_field() {
        let p = NewUserPayload {
            email: Some(json!("not-an-email")),
            username: Some(json!("al")),
            full_name: None,
            is_active: Some(json!(false)),
            password: Some(json!("short")),
        };
        let got = fields(p.validate().unwrap_err());
        assert_eq!(got, vec!["user.email", "user.username", "user.password"]);
    }

    #[test]
    fn create_reports_missing_fields() {
        let got = fields(NewUserPayload::default().validate().unwrap_err());
        assert_eq!(got, vec!["user.email", "user.username", "user.password"]);
    }

    #[test]
    fn create_reports_each_mistyped_field() {
        let p = NewUserPayload {
            email: Some(json!(123)),
            username: Some(json!(7)),
            full_name: Some(json!(["Alice"])),
            is_active: Some(json!("yes")),
            password: Some(json!("short")),
        };
        let AppError::Validation(errors) = p.validate().unwrap_err() else {
            panic!("expected validation error");
        };
        let got: Vec<(&str, &str)> = errors
            .iter()
            .map(|e| (e.field.as_str(), e.message.as_str()))
            .collect();
        assert_eq!(
            got,
            vec![
                ("user.email", "str type expected"),
                ("user.username", "str type expected"),
                ("user.full_name", "str type expected"),
                ("user.is_active", "value could not be parsed to a boolean"),
                ("user.password", "ensure this value has at least 8 characters"),
            ]
        );
    }

    #[test]
    fn username_bounds_are_inclusive() {
        let mut p = payload();
        p.username = Some(json!("abc"));
        assert!(p.validate().is_ok());

        let mut p = payload();
        p.username = Some(json!("a".repeat(USERNAME_MAX_LEN)));
        assert!(p.validate().is_ok());

        let mut p = payload();
        p.username = Some(json!("a".repeat(USERNAME_MAX_LEN + 1)));
        assert_eq!(fields(p.validate().unwrap_err()), vec!["user.username"]);
    }

    #[test]
    fn password_needs_eight_chars() {
        let mut p = payload();
        p.password = Some(json!("1234567"));
        assert_eq!(fields(p.validate().unwrap_err()), vec!["user.password"]);

        let mut p = payload();
        p.password = Some(json!("12345678"));
        assert!(p.validate().is_ok());
    }

    #[test]
    fn empty_update_is_valid() {
        let update = UpdateUserPayload::default().validate().unwrap();
        assert_eq!(update, UserUpdate::default());
    }

    #[test]
    fn update_rejects_null_on_required_columns() {
        let payload = UpdateUserPayload {
            email: Patch::Null,
            username: Patch::Null,
            full_name: Patch::Null,
            is_active: Patch::Null,
        };
        let got = fields(payload.validate().unwrap_err());
        assert_eq!(got, vec!["user.email", "user.username", "user.is_active"]);
    }

    #[test]
    fn update_allows_clearing_full_name() {
        let payload = UpdateUserPayload {
            full_name: Patch::Null,
            ..Default::default()
        };
        assert_eq!(payload.validate().unwrap().full_name, Patch::Null);
    }

    #[test]
    fn update_checks_present_values() {
        let payload = UpdateUserPayload {
            email: Patch::Value(json!("bad")),
            username: Patch::Value(json!("xy")),
            ..Default::default()
        };
        assert_eq!(
            fields(payload.validate().unwrap_err()),
            vec!["user.email", "user.username"]
        );
    }

    #[test]
    fn update_reports_each_mistyped_field() {
        let payload = UpdateUserPayload {
            email: Patch::Value(json!(1)),
            username: Patch::Value(json!(true)),
            full_name: Patch::Value(json!({})),
            is_active: Patch::Value(json!("no")),
        };
        assert_eq!(
            fields(payload.validate().unwrap_err()),
            vec!["user.email", "user.username", "user.full_name", "user.is_active"]
        );
    }

    #[test]
    fn list_params_defaults() {
        let filter = ListParams::default().validate().unwrap();
        assert_eq!(filter.skip, 0);
        assert_eq!(filter.limit, LIMIT_DEFAULT);
        assert_eq!(filter.is_active, None);
    }

    #[test]
    fn list_params_bounds() {
        let bad = query(Some("-1"), Some("0"), None);
        assert_eq!(
            fields(bad.validate().unwrap_err()),
            vec!["query.skip", "query.limit"]
        );

        let too_big = query(Some("0"), Some("101"), Some("true"));
        assert_eq!(fields(too_big.validate().unwrap_err()), vec!["query.limit"]);

        let edge = query(Some(&i64::MAX.to_string()), Some("100"), None)
            .validate()
            .unwrap();
        assert_eq!(edge.skip, i64::MAX);
        assert_eq!(edge.limit, LIMIT_MAX);
    }

    #[test]
    fn list_params_report_each_unparsable_value() {
        let bad = query(Some("x"), Some("y"), Some("maybe"));
        assert_eq!(
            fields(bad.validate().unwrap_err()),
            vec!["query.skip", "query.limit", "query.is_active"]
        );
    }

    #[test]
    fn list_params_parse_boolean_spellings() {
        let on = query(None, None, Some("TRUE")).validate().unwrap();
        assert_eq!(on.is_active, Some(true));
        let off = query(None, None, Some("0")).validate().unwrap();
        assert_eq!(off.is_active, Some(false));
    }
}
