use std::fmt;
use std::str::FromStr;

/// Addressable fields of a project document, named as they appear on the wire.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Field {
    Id,
    Name,
    Description,
    Status,
    Deadline,
    AssignedTo,
    Budget,
    CreatedAt,
    UpdatedAt,
}

impl Field {
    pub const SORTABLE: [Field; 6] = [
        Field::CreatedAt,
        Field::UpdatedAt,
        Field::Deadline,
        Field::Name,
        Field::Budget,
        Field::Status,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
            Self::Description => "description",
            Self::Status => "status",
            Self::Deadline => "deadline",
            Self::AssignedTo => "assignedTo",
            Self::Budget => "budget",
            Self::CreatedAt => "createdAt",
            Self::UpdatedAt => "updatedAt",
        }
    }

    pub fn is_sortable(&self) -> bool {
        Self::SORTABLE.contains(self)
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Field {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "id" | "_id" => Ok(Self::Id),
            "name" => Ok(Self::Name),
            "description" => Ok(Self::Description),
            "status" => Ok(Self::Status),
            "deadline" => Ok(Self::Deadline),
            "assignedTo" | "assigned_to" => Ok(Self::AssignedTo),
            "budget" => Ok(Self::Budget),
            "createdAt" | "created_at" => Ok(Self::CreatedAt),
            "updatedAt" | "updated_at" => Ok(Self::UpdatedAt),
            other => Err(format!("unknown field '{}'", other)),
        }
    }
}
