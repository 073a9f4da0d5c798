use derive_more::Display;

///
/// QueryOperator
///
/// Operators recognised in an outer query chain.
///

#[derive(Clone, Copy, Debug, Display, Eq, Hash, PartialEq)]
pub enum QueryOperator {
    Where,
    OrderBy,
    OrderByDescending,
    ThenBy,
    ThenByDescending,
    Select,
    GroupBy,
    Skip,
    Take,
    First,
    FirstOrDefault,
    FirstLazy,
    Any,
    Expand,
    OfType,
    WithTotalCount,
    ToUri,
}

impl QueryOperator {
    pub const ALL: [Self; 17] = [
        Self::Where,
        Self::OrderBy,
        Self::OrderByDescending,
        Self::ThenBy,
        Self::ThenByDescending,
        Self::Select,
        Self::GroupBy,
        Self::Skip,
        Self::Take,
        Self::First,
        Self::FirstOrDefault,
        Self::FirstLazy,
        Self::Any,
        Self::Expand,
        Self::OfType,
        Self::WithTotalCount,
        Self::ToUri,
    ];

    /// Operators that end a chain; nothing may be applied after them.
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(
            self,
            Self::First | Self::FirstOrDefault | Self::FirstLazy | Self::Any | Self::ToUri
        )
    }

    #[must_use]
    pub const fn is_ordering(self) -> bool {
        matches!(
            self,
            Self::OrderBy | Self::OrderByDescending | Self::ThenBy | Self::ThenByDescending
        )
    }
}
