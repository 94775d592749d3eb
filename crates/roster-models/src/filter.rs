use chrono::{DateTime, Utc};
use roster_core::OrderField;

use crate::role::{Department, Role};

/// Filters for user listings. Every field is optional and filters combine with AND.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct QueryFilter {
    /// Substring match on the name.
    pub name: Option<String>,
    pub department: Option<Department>,
    /// Matches users holding any of these roles.
    pub roles: Option<Vec<Role>>,
    pub start_created_at: Option<DateTime<Utc>>,
    pub end_created_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum UserOrderField {
    Name,
    Email,
    CreatedAt,
    UpdatedAt,
}

impl UserOrderField {
    pub fn column(&self) -> &'static str {
        match self {
            Self::Name => "name",
            Self::Email => "email",
            Self::CreatedAt => "created_at",
            Self::UpdatedAt => "updated_at",
        }
    }
}

impl OrderField for UserOrderField {
    const DEFAULT: Self = UserOrderField::CreatedAt;

    fn from_name(name: &str) -> Option<Self> {
        match name {
            "name" => Some(Self::Name),
            "email" => Some(Self::Email),
            "created_at" | "createdAt" => Some(Self::CreatedAt),
            "updated_at" | "updatedAt" => Some(Self::UpdatedAt),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use roster_core::{Direction, OrderBy};

    #[test]
    fn test_order_by_accepts_both_spellings() {
        let a = OrderBy::<UserOrderField>::parse("createdAt,desc").unwrap();
        let b = OrderBy::<UserOrderField>::parse("created_at,desc").unwrap();
        assert_eq!(a, b);
        assert_eq!(a.direction, Direction::Desc);
    }

    #[test]
    fn test_default_order_is_created_at_asc() {
        let order = OrderBy::<UserOrderField>::default();
        assert_eq!(order.field.column(), "created_at");
        assert_eq!(order.direction, Direction::Asc);
    }
}
