use std::fmt;

/// Why a celebrity is linked to a movie
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Role {
    Director,
    Scriptwriter,
    Actor,
}

impl Role {
    /// Integer code stored in the role-mapping table
    pub fn code(&self) -> i64 {
        match self {
            Self::Director => 1,
            Self::Scriptwriter => 2,
            Self::Actor => 3,
        }
    }

    /// Parses a role from its stored integer code
    ///
    /// Returns None if the code doesn't match any known role.
    pub fn from_code(code: i64) -> Option<Self> {
        match code {
            1 => Some(Self::Director),
            2 => Some(Self::Scriptwriter),
            3 => Some(Self::Actor),
            _ => None,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Director => "director",
            Self::Scriptwriter => "scriptwriter",
            Self::Actor => "actor",
        };
        write!(f, "{}", name)
    }
}

/// A person credited on a movie page
///
/// Only `id`, `name` and `role` are filled in by the crawler. Celebrity pages
/// are never fetched, so `unique_id`, `birth_date` and `birth_place` stay unset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Celebrity {
    pub id: String,
    pub name: Option<String>,
    pub role: Option<Role>,
    pub unique_id: Option<String>,
    pub birth_date: Option<String>,
    pub birth_place: Option<String>,
}

impl Celebrity {
    /// Creates a celebrity that only knows its id
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: None,
            role: None,
            unique_id: None,
            birth_date: None,
            birth_place: None,
        }
    }

    /// Creates a celebrity as discovered in a movie's credits
    pub fn credited(id: impl Into<String>, name: impl Into<String>, role: Role) -> Self {
        Self {
            name: Some(name.into()),
            role: Some(role),
            ..Self::new(id)
        }
    }

    /// A celebrity counts as partial until both its id and name are known
    pub fn is_partial(&self) -> bool {
        self.id.is_empty() || self.name.is_none()
    }
}
