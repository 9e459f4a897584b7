use std::{
    fmt,
    fmt::{Debug, Display},
};

/// A thin wrapper that keeps credentials out of logs. The value is only accessible via an explicit
/// [`Secret::reveal`] call; `Debug` and `Display` both print a redaction marker.
#[derive(Clone, Default)]
pub struct Secret<T>
where T: Clone
{
    value: T,
}

impl<T: Clone> Secret<T> {
    pub fn new(value: T) -> Self {
        Self { value }
    }

    pub fn reveal(&self) -> &T {
        &self.value
    }

    pub fn into_inner(self) -> T {
        self.value
    }
}

impl<T: Clone> From<T> for Secret<T> {
    fn from(value: T) -> Self {
        Self::new(value)
    }
}

impl<T: Clone> Debug for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}

impl<T: Clone> Display for Secret<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("****")
    }
}
