use serde::{Deserialize, Serialize};

/// One page of a server-side paginated listing.
///
/// Only `content` and `last` matter to the client; the remaining page
/// metadata the server sends is ignored.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Page<T> {
    #[serde(default = "Vec::new")]
    pub content: Vec<T>,
    /// A page without the flag is treated as the final one
    #[serde(default = "default_last")]
    pub last: bool,
}

fn default_last() -> bool {
    true
}

impl<T> Page<T> {
    pub fn new(content: Vec<T>, last: bool) -> Self {
        Self { content, last }
    }

    pub fn has_more(&self) -> bool {
        !self.last
    }
}
