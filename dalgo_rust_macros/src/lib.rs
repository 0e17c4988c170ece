mod validate;

use proc_macro::TokenStream;

/// Derive macro for the `Validate` trait.
///
/// # Usage
///
/// ```ignore
/// #[derive(Serialize, Deserialize, Validate)]
/// struct TestData {
///     #[serde(rename = "StringProp")]
///     #[validate(required)]
///     pub string_prop: String,
///     #[serde(rename = "IntegerProp")]
///     #[validate(min = 0)]
///     pub integer_prop: i64,
/// }
/// ```
///
/// - `#[validate(required)]`: the field must be present (non-blank string,
///   `Some`, non-empty `Vec`), otherwise a missing-required-field error.
/// - `#[validate(min = expr)]` / `#[validate(max = expr)]`: bounds check,
///   otherwise a bad-field-value error.
/// - `#[validate(rename = "...")]`: field name reported in errors. Falls back
///   to `#[serde(rename = "...")]`, then to the Rust field name.
///
/// Checks run in field order and stop at the first failure.
#[proc_macro_derive(Validate, attributes(validate))]
pub fn derive_validate(input: TokenStream) -> TokenStream {
    validate::derive_validate(input)
}
