//! Extractor wrappers whose rejections render as [`ApiError`] instead of
//! axum's plain-text defaults.

use axum::extract::{FromRequest, FromRequestParts};

use crate::error::ApiError;

#[derive(FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

#[derive(FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

pub const MAX_NAME_LEN: usize = 255;

/// Trims a title or name and checks it is non-empty and at most
/// [`MAX_NAME_LEN`] characters.
pub fn clean_name(field: &'static str, raw: &str) -> Result<String, ApiError> {
    let name = raw.trim();
    if name.is_empty() {
        return Err(ApiError::field(field, "This field may not be blank."));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(ApiError::field(
            field,
            format!("Ensure this field has no more than {} characters.", MAX_NAME_LEN),
        ));
    }
    Ok(name.to_string())
}

/// A parent-id query filter such as `?variant=`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParentFilter {
    /// Absent or blank: no narrowing.
    Any,
    Id(i64),
    /// Not an id, so it cannot name an owned parent.
    Unmatched,
}

impl ParentFilter {
    pub fn parse(raw: Option<&str>) -> Self {
        match raw.map(str::trim) {
            None | Some("") => ParentFilter::Any,
            Some(v) => v.parse().map_or(ParentFilter::Unmatched, ParentFilter::Id),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parent_filter_is_lenient() {
        assert_eq!(ParentFilter::parse(None), ParentFilter::Any);
        assert_eq!(ParentFilter::parse(Some(" ")), ParentFilter::Any);
        assert_eq!(ParentFilter::parse(Some("12")), ParentFilter::Id(12));
        assert_eq!(ParentFilter::parse(Some("abc")), ParentFilter::Unmatched);
    }

    #[test]
    fn clean_name_trims_and_bounds() {
        assert_eq!(clean_name("name", "  Paris ").unwrap(), "Paris");
        assert!(matches!(
            clean_name("name", "   "),
            Err(ApiError::Validation { field: Some("name"), .. })
        ));
        assert!(clean_name("title", &"é".repeat(MAX_NAME_LEN)).is_ok());
        assert!(clean_name("title", &"x".repeat(MAX_NAME_LEN + 1)).is_err());
    }
}
