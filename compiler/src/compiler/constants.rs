pub const CTE_ALIAS_PREFIX: &str = "cte";
pub const CTE_PK_COLUMN_ALIAS: &str = "pk";
pub const CTE_VALUE_COLUMN_ALIAS: &str = "v";

/// Joins the parts of a multi-field column into one fetched string.
pub const SEPARATOR: &str = "|**gq**|";

/// Every query selects the row key under this alias.
pub const CHECKBOX_ATTRIBUTE: &str = "checkbox_attribute";

/// Editable columns also select their record key as `<name>_edit_id`.
pub const EDIT_ID_SUFFIX: &str = "_edit_id";

pub const COUNT_ALIAS: &str = "aggregate";

/// We may eventually make this configurable
pub const INDENT_SPACER: &str = "  ";
