/// Serde helper functions for custom serialization

/// Skip serializing if Option is None
#[inline]
pub fn is_none<T>(value: &Option<T>) -> bool {
    value.is_none()
}
