//! Message keys recorded in an [`ErrorMap`](super::ErrorMap)

/// A required entry is blank; argument: field label
pub const ERROR_EMPTY_ENTRY: &str = "error.empty.entry";

/// `activeToDate` precedes `activeFromDate`
pub const ERROR_ACTIVE_TO_DATE_BEFORE_FROM_DATE: &str = "error.active.to.date.before.from.date";

/// Required attribute missing; argument: attribute name
pub const ERROR_REQUIRED: &str = "error.required";

/// Value does not match the attribute pattern; arguments: attribute, value
pub const ERROR_INVALID_FORMAT: &str = "error.invalid.format";

/// Attribute not declared by the role type
pub const ERROR_UNKNOWN_ATTRIBUTE: &str = "error.attribute.unknown";

/// Value too long; arguments: attribute, maximum length
pub const ERROR_MAX_LENGTH: &str = "error.max.length";

/// Entry already present on the document
pub const ERROR_DUPLICATE_ENTRY: &str = "error.duplicate.entry";

/// Value not recognised; arguments: field label, value
pub const ERROR_INVALID_ENTRY: &str = "error.invalid.entry";

/// Role listed as its own member
pub const ERROR_ROLE_CONTAINS_ITSELF: &str = "error.role.contains.itself";
