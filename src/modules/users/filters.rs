use chrono::{DateTime, Utc};
use roster_core::{AppError, FieldErrors, OrderBy, OrderByError, Page, PageError};
use roster_models::{Department, QueryFilter, Role, UserOrderField};

const NAME_MIN: usize = 4;
const NAME_MAX: usize = 120;

/// Listing parameters parsed from the query string.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserQuery {
    pub filter: QueryFilter,
    pub order: OrderBy<UserOrderField>,
    pub page: Page,
}

/// Parses `page`, `rows`, `order_by` and the filter fields.
///
/// `roles` may repeat. Every problem is reported, keyed by parameter name, in
/// a single validation error.
pub fn parse_query(query: Option<&str>) -> Result<UserQuery, AppError> {
    let mut page = None;
    let mut rows = None;
    let mut order_by = None;
    let mut name = None;
    let mut department = None;
    let mut roles = Vec::new();
    let mut start = None;
    let mut end = None;

    for (key, value) in url::form_urlencoded::parse(query.unwrap_or_default().as_bytes()) {
        match key.as_ref() {
            "page" => page = Some(value.into_owned()),
            "rows" => rows = Some(value.into_owned()),
            "order_by" => order_by = Some(value.into_owned()),
            "name" => name = Some(value.into_owned()),
            "department" => department = Some(value.into_owned()),
            "roles" => roles.push(value.into_owned()),
            "start_created_at" => start = Some(value.into_owned()),
            "end_created_at" => end = Some(value.into_owned()),
            _ => {}
        }
    }

    let mut fields = FieldErrors::new();
    let mut filter = QueryFilter::default();

    let page = match Page::parse(page.as_deref(), rows.as_deref()) {
        Ok(page) => Some(page),
        Err(e) => {
            let key = match e {
                PageError::InvalidPage(_) | PageError::PageTooSmall | PageError::PageTooBig => {
                    "page"
                }
                PageError::InvalidRows(_) | PageError::RowsTooSmall | PageError::RowsTooBig => {
                    "rows"
                }
            };
            fields.insert(key.to_string(), e.to_string());
            None
        }
    };

    let order = match OrderBy::<UserOrderField>::parse(order_by.as_deref().unwrap_or_default()) {
        Ok(order) => Some(order),
        Err(e) => {
            fields.insert("order_by".to_string(), order_error(&e));
            None
        }
    };

    if let Some(name) = name.filter(|n| !n.is_empty()) {
        let len = name.chars().count();
        if (NAME_MIN..=NAME_MAX).contains(&len) {
            filter.name = Some(name);
        } else {
            fields.insert(
                "name".to_string(),
                format!("name must be between {NAME_MIN} and {NAME_MAX} characters"),
            );
        }
    }

    if let Some(department) = department.filter(|d| !d.is_empty()) {
        match department.parse::<Department>() {
            Ok(d) => filter.department = Some(d),
            Err(e) => {
                fields.insert("department".to_string(), e.to_string());
            }
        }
    }

    if !roles.is_empty() {
        match Role::parse_many(&roles) {
            Ok(roles) => filter.roles = Some(roles),
            Err(e) => {
                fields.insert("roles".to_string(), e.to_string());
            }
        }
    }

    for (key, raw, slot) in [
        ("start_created_at", start, &mut filter.start_created_at),
        ("end_created_at", end, &mut filter.end_created_at),
    ] {
        let Some(raw) = raw.filter(|r| !r.is_empty()) else {
            continue;
        };
        match DateTime::parse_from_rfc3339(&raw) {
            Ok(at) => *slot = Some(at.with_timezone(&Utc)),
            Err(_) => {
                fields.insert(key.to_string(), format!("{key} must be an RFC 3339 timestamp"));
            }
        }
    }

    match (page, order) {
        (Some(page), Some(order)) if fields.is_empty() => Ok(UserQuery {
            filter,
            order,
            page,
        }),
        _ => Err(AppError::validation(fields)),
    }
}

fn order_error(err: &OrderByError) -> String {
    match err {
        OrderByError::UnknownField(_) => {
            format!("{err}; expected one of: name, email, created_at, updated_at")
        }
        _ => err.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::StatusCode;
    use roster_core::Direction;

    #[test]
    fn test_defaults() {
        let query = parse_query(None).unwrap();
        assert_eq!(query.filter, QueryFilter::default());
        assert_eq!(query.order, OrderBy::default());
        assert_eq!(query.page, Page::new(1, 10).unwrap());
    }

    #[test]
    fn test_repeated_roles() {
        let query =
            parse_query(Some("roles=admin&roles=user&page=1&rows=1&order_by=name,desc")).unwrap();

        assert_eq!(query.filter.roles, Some(vec![Role::Admin, Role::User]));
        assert_eq!(query.order.field, UserOrderField::Name);
        assert_eq!(query.order.direction, Direction::Desc);
        assert_eq!(query.page.rows(), 1);
    }

    #[test]
    fn test_dates_and_department() {
        let query = parse_query(Some(
            "department=marketing&start_created_at=2024-01-01T00:00:00Z&end_created_at=2024-12-31T23:59:59%2B02:00",
        ))
        .unwrap();

        assert_eq!(query.filter.department, Some(Department::Marketing));
        assert!(query.filter.start_created_at.is_some());
        assert_eq!(
            query.filter.end_created_at.unwrap().to_rfc3339(),
            "2024-12-31T21:59:59+00:00"
        );
    }

    #[test]
    fn test_all_problems_reported() {
        let err = parse_query(Some(
            "page=0&rows=500&order_by=age,up&name=ab&department=hr&roles=root&start_created_at=yesterday",
        ))
        .unwrap_err();

        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        let fields = err.fields.unwrap();
        for key in ["page", "order_by", "name", "department", "roles", "start_created_at"] {
            assert!(fields.contains_key(key), "missing {key}: {fields:?}");
        }
    }

    #[test]
    fn test_rows_too_big() {
        let err = parse_query(Some("rows=101")).unwrap_err();
        assert!(err.fields.unwrap().contains_key("rows"));
    }

    #[test]
    fn test_page_offset_out_of_range() {
        let err = parse_query(Some("page=9223372036854775807&rows=10")).unwrap_err();
        assert_eq!(err.status, StatusCode::BAD_REQUEST);
        let fields = err.fields.unwrap();
        assert_eq!(fields["page"], "page value too big, offset out of range");
    }

    #[test]
    fn test_order_by_too_many_parts() {
        let err = parse_query(Some("order_by=name,asc,extra")).unwrap_err();
        assert!(err.fields.unwrap().contains_key("order_by"));
    }
}
