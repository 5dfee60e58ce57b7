use crate::errors::{ErrorKind, PralineError, PralineResult};

/// Specifies the direction for sorting documents and building indexes.
///
/// # Purpose
/// Defines whether documents should be sorted in ascending (low to high) or
/// descending (high to low) order. Used in query options and index
/// specifications.
///
/// # Usage
/// Used with [`Cursor::sort`](crate::collection::Cursor::sort) and
/// [`Collection::index`](crate::collection::Collection::index):
/// ```text
/// let cursor = zagnuts.all()?.sort(("weight", SortOrder::Descending))?;
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum SortOrder {
    /// Sort in ascending order (smallest to largest, A-Z, oldest to newest)
    Ascending,
    /// Sort in descending order (largest to smallest, Z-A, newest to oldest)
    Descending,
}

impl SortOrder {
    /// Parses a direction token.
    ///
    /// Accepted ascending tokens: `asc`, `up`, `ascending`. Accepted
    /// descending tokens: `desc`, `down`, `descending`. Anything else is an
    /// [`ErrorKind::IndexDirection`] error.
    pub fn from_token(token: &str) -> PralineResult<SortOrder> {
        match token {
            "asc" | "up" | "ascending" => Ok(SortOrder::Ascending),
            "desc" | "down" | "descending" => Ok(SortOrder::Descending),
            other => {
                log::error!("Sort direction should be asc/up or desc/down, got: {}", other);
                Err(PralineError::new(
                    &format!("Sort direction should be asc/up or desc/down, got: {}", other),
                    ErrorKind::IndexDirection,
                ))
            }
        }
    }

    /// Parses the wire form of a direction: `1` ascending, `-1` descending.
    pub fn from_wire(direction: i64) -> PralineResult<SortOrder> {
        match direction {
            1 => Ok(SortOrder::Ascending),
            -1 => Ok(SortOrder::Descending),
            other => {
                log::error!("Sort direction should be 1 or -1, got: {}", other);
                Err(PralineError::new(
                    &format!("Sort direction should be 1 or -1, got: {}", other),
                    ErrorKind::IndexDirection,
                ))
            }
        }
    }

    /// Returns `true` when `token` names a direction, i.e. when
    /// [`SortOrder::from_token`] would succeed.
    pub fn is_token(token: &str) -> bool {
        matches!(
            token,
            "asc" | "up" | "ascending" | "desc" | "down" | "descending"
        )
    }

    /// The wire form of this direction: `1` ascending, `-1` descending.
    pub fn wire(&self) -> i64 {
        match self {
            SortOrder::Ascending => 1,
            SortOrder::Descending => -1,
        }
    }
}
