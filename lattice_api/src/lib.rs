pub mod constants;
pub mod document;
pub mod error;
pub mod model;

/// Returns true if the value equals its type's default. Used with
/// `skip_serializing_if` to keep rendered documents free of noise fields.
pub(crate) fn is_default<T: Default + PartialEq>(value: &T) -> bool {
    *value == T::default()
}
