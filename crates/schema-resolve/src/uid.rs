//! Hierarchical UID composition
//!
//! Each scope reserves a fixed number of decimal digits for its children:
//! two for categories within an extension, three for classes within a
//! category and two for types within a class. A composite UID can therefore
//! be decoded again with integer division and modulo.

use thiserror::Error;

/// Categories per extension.
pub const CATEGORY_UID_BOUND: i64 = 100;
/// Classes per category.
pub const CLASS_UID_BOUND: i64 = 1000;
/// Types per class.
pub const TYPE_UID_BOUND: i64 = 100;

/// A UID that cannot be composed into its parent scope
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum UidError {
    #[error("{scope} {value} should be less than {bound} (not yet scoped)")]
    OutOfRange {
        scope: &'static str,
        value: i64,
        bound: i64,
    },

    #[error("{scope} {value} must not be negative")]
    Negative { scope: &'static str, value: i64 },

    #[error("{scope} {value} overflows when scoped by {parent}")]
    Overflow {
        scope: &'static str,
        value: i64,
        parent: i64,
    },
}

fn compose(
    scope: &'static str,
    parent_scope: &'static str,
    parent: i64,
    value: i64,
    bound: i64,
) -> Result<i64, UidError> {
    if parent < 0 {
        return Err(UidError::Negative {
            scope: parent_scope,
            value: parent,
        });
    }
    if value < 0 {
        return Err(UidError::Negative { scope, value });
    }
    if value >= bound {
        return Err(UidError::OutOfRange {
            scope,
            value,
            bound,
        });
    }
    parent
        .checked_mul(bound)
        .and_then(|p| p.checked_add(value))
        .ok_or(UidError::Overflow {
            scope,
            value,
            parent,
        })
}

/// Return an extension-specific category UID.
pub fn extension_scoped_category_uid(
    extension_uid: i64,
    category_uid: i64,
) -> Result<i64, UidError> {
    compose(
        "category_uid",
        "extension_uid",
        extension_uid,
        category_uid,
        CATEGORY_UID_BOUND,
    )
}

/// Return a category-specific class UID.
pub fn category_scoped_class_uid(category_uid: i64, class_uid: i64) -> Result<i64, UidError> {
    compose(
        "class_uid",
        "category_uid",
        category_uid,
        class_uid,
        CLASS_UID_BOUND,
    )
}

/// Return a class-specific type UID.
pub fn class_uid_scoped_type_uid(class_uid: i64, type_uid: i64) -> Result<i64, UidError> {
    compose("type_uid", "class_uid", class_uid, type_uid, TYPE_UID_BOUND)
}
