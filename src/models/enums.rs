use serde::{Deserialize, Serialize};

/// Unknown string for one of the wire / storage enums below.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid value for {field}: {value}")]
pub struct InvalidEnum {
    pub field: &'static str,
    pub value: String,
}

/// Macro to generate enum with as_str + std::str::FromStr pattern.
/// The string form is also the serde form, so wire and storage agree.
macro_rules! str_enum {
    ($(#[$meta:meta])* $name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
        pub enum $name {
            $(#[serde(rename = $s)] $variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }

            pub fn all() -> &'static [$name] {
                &[$(Self::$variant),+]
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl std::str::FromStr for $name {
            type Err = InvalidEnum;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(InvalidEnum {
                        field: stringify!($name),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(WorkoutLevel {
    Beginner => "beginner",
    Intermediate => "intermediate",
    Advanced => "advanced",
});

str_enum!(Difficulty {
    Easy => "easy",
    Medium => "medium",
    Hard => "hard",
});

str_enum!(
    /// Choice offered after a capture; remembered as the next default.
    EquipmentSelection {
        Bodyweight => "bodyweight",
        Dumbbells => "dumbbells",
        Mat => "mat",
    }
);

str_enum!(
    /// Last OS answer for a permission. The OS stays authoritative.
    PermissionStatus {
        Granted => "granted",
        Denied => "denied",
        Undetermined => "undetermined",
    }
);

str_enum!(PermissionKind {
    Camera => "camera",
    Gallery => "gallery",
});

impl Default for PermissionStatus {
    fn default() -> Self {
        Self::Undetermined
    }
}

impl PermissionStatus {
    pub fn is_granted(&self) -> bool {
        matches!(self, Self::Granted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn workout_level_round_trip() {
        for (variant, s) in [
            (WorkoutLevel::Beginner, "beginner"),
            (WorkoutLevel::Intermediate, "intermediate"),
            (WorkoutLevel::Advanced, "advanced"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(WorkoutLevel::from_str(s).unwrap(), variant);
        }
    }

    #[test]
    fn permission_status_round_trip() {
        for status in PermissionStatus::all() {
            assert_eq!(PermissionStatus::from_str(status.as_str()).unwrap(), *status);
        }
    }

    #[test]
    fn serde_uses_lowercase_form() {
        let json = serde_json::to_string(&EquipmentSelection::Dumbbells).unwrap();
        assert_eq!(json, "\"dumbbells\"");
        let parsed: Difficulty = serde_json::from_str("\"hard\"").unwrap();
        assert_eq!(parsed, Difficulty::Hard);
    }

    #[test]
    fn invalid_enum_returns_error() {
        let err = EquipmentSelection::from_str("barbell").unwrap_err();
        assert_eq!(err.field, "EquipmentSelection");
        assert_eq!(err.value, "barbell");
        assert!(PermissionStatus::from_str("").is_err());
        assert!(WorkoutLevel::from_str("Beginner").is_err());
    }

    #[test]
    fn permission_defaults_to_undetermined() {
        assert_eq!(PermissionStatus::default(), PermissionStatus::Undetermined);
        assert!(!PermissionStatus::default().is_granted());
    }
}
