//! Operation identities and lockable resources.

use std::fmt;

use feedbuf_core::VideoId;

/// A named mutual-exclusion token.
///
/// Two operations declaring the same resource never run at the same time.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum Resource {
    /// Serializes feed window mutation.
    Rotate,
    /// Serializes eviction and clearing of the disk cache.
    CacheCleanup,
    /// Serializes first-time cache initialization.
    CacheInit,
    /// Serializes downloads of one video; distinct ids are independent.
    Video(VideoId),
}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rotate => f.write_str("buffer_rotate"),
            Self::CacheCleanup => f.write_str("cache_cleanup"),
            Self::CacheInit => f.write_str("cache_init"),
            Self::Video(id) => write!(f, "video_{id}"),
        }
    }
}

/// De-duplication key of a scheduled operation.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationId(String);

impl OperationId {
    /// Create an operation id.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Borrow the raw id.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for OperationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for OperationId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}

impl From<String> for OperationId {
    fn from(value: String) -> Self {
        Self(value)
    }
}

/// Scheduling parameters of one operation.
#[derive(Clone, Debug)]
pub struct Operation {
    /// De-duplication key.
    pub id: OperationId,
    /// Higher runs first among ready operations.
    pub priority: i32,
    /// Locks held for the whole run.
    pub resources: Vec<Resource>,
}

impl Operation {
    /// Create an operation with default priority and no resources.
    pub fn new(id: impl Into<OperationId>) -> Self {
        Self {
            id: id.into(),
            priority: 0,
            resources: Vec::new(),
        }
    }

    /// Set the priority.
    #[must_use]
    pub const fn priority(mut self, priority: i32) -> Self {
        self.priority = priority;
        self
    }

    /// Require a resource.
    #[must_use]
    pub fn resource(mut self, resource: Resource) -> Self {
        if !self.resources.contains(&resource) {
            self.resources.push(resource);
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resource_names() {
        assert_eq!(Resource::Rotate.to_string(), "buffer_rotate");
        assert_eq!(Resource::CacheCleanup.to_string(), "cache_cleanup");
        assert_eq!(Resource::CacheInit.to_string(), "cache_init");
        assert_eq!(Resource::Video(VideoId::new("abc")).to_string(), "video_abc");
    }

    #[test]
    fn test_video_resources_compare_by_id() {
        assert_eq!(
            Resource::Video(VideoId::new("a")),
            Resource::Video(VideoId::new("a"))
        );
        assert_ne!(
            Resource::Video(VideoId::new("a")),
            Resource::Video(VideoId::new("b"))
        );
    }

    #[test]
    fn test_operation_builder_dedups_resources() {
        let op = Operation::new("rotate_forward")
            .priority(3)
            .resource(Resource::Rotate)
            .resource(Resource::Rotate);
        assert_eq!(op.priority, 3);
        assert_eq!(op.resources, vec![Resource::Rotate]);
    }
}
