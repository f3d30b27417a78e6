//! Character identity and the attribute point budget.

use std::fmt;
use std::str::FromStr;

use duet_core::error::DomainError;
use serde::{Deserialize, Serialize};

/// Maximum sum of the three attribute scores.
pub const POINT_CAP: u8 = 20;

/// Lowest score any attribute may have.
pub const MIN_SCORE: u8 = 1;

/// Longest accepted character name, in characters.
pub const MAX_NAME_CHARS: usize = 64;

/// Character classes offered at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterClass {
    /// Barbarian.
    Barbarian,
    /// Bard.
    Bard,
    /// Fighter.
    Fighter,
    /// Rogue.
    Rogue,
    /// Sorcerer.
    Sorcerer,
    /// Cleric.
    Cleric,
}

impl CharacterClass {
    /// Storage representation, identical to the serde name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Barbarian => "barbarian",
            Self::Bard => "bard",
            Self::Fighter => "fighter",
            Self::Rogue => "rogue",
            Self::Sorcerer => "sorcerer",
            Self::Cleric => "cleric",
        }
    }
}

impl fmt::Display for CharacterClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for CharacterClass {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "barbarian" => Ok(Self::Barbarian),
            "bard" => Ok(Self::Bard),
            "fighter" => Ok(Self::Fighter),
            "rogue" => Ok(Self::Rogue),
            "sorcerer" => Ok(Self::Sorcerer),
            "cleric" => Ok(Self::Cleric),
            other => Err(DomainError::Validation(format!("unknown class: {other}"))),
        }
    }
}

/// Character races offered at creation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CharacterRace {
    /// Human.
    Human,
    /// Elf.
    Elf,
    /// Dwarf.
    Dwarf,
    /// Tiefling.
    Tiefling,
    /// Githyanki.
    Githyanki,
    /// Half-orc.
    HalfOrc,
}

impl CharacterRace {
    /// Storage representation, identical to the serde name.
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Human => "human",
            Self::Elf => "elf",
            Self::Dwarf => "dwarf",
            Self::Tiefling => "tiefling",
            Self::Githyanki => "githyanki",
            Self::HalfOrc => "half_orc",
        }
    }

    /// Name used in narration.
    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Self::HalfOrc => "half-orc",
            other => other.as_str(),
        }
    }
}

impl CharacterRace {
    /// Indefinite article for prose ("an elf", "a dwarf").
    #[must_use]
    pub fn article(self) -> &'static str {
        match self {
            Self::Elf => "an",
            _ => "a",
        }
    }
}

impl fmt::Display for CharacterRace {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

impl FromStr for CharacterRace {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "human" => Ok(Self::Human),
            "elf" => Ok(Self::Elf),
            "dwarf" => Ok(Self::Dwarf),
            "tiefling" => Ok(Self::Tiefling),
            "githyanki" => Ok(Self::Githyanki),
            "half_orc" => Ok(Self::HalfOrc),
            other => Err(DomainError::Validation(format!("unknown race: {other}"))),
        }
    }
}

/// Who the player is.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Character {
    /// Display name.
    pub name: String,
    /// Class.
    pub class: CharacterClass,
    /// Race.
    pub race: CharacterRace,
}

impl Character {
    /// Checks the name is present and not too long.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` for an empty or oversized name.
    pub fn validate(&self) -> Result<(), DomainError> {
        let name = self.name.trim();
        if name.is_empty() {
            return Err(DomainError::Validation("character name is required".into()));
        }
        if name.chars().count() > MAX_NAME_CHARS {
            return Err(DomainError::Validation(format!(
                "character name must be at most {MAX_NAME_CHARS} characters"
            )));
        }
        Ok(())
    }
}

/// One of the three scored attributes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute {
    /// Strength.
    Strength,
    /// Dexterity.
    Dexterity,
    /// Intelligence.
    Intelligence,
}

/// The attribute triple. Each score is at least [`MIN_SCORE`] and the sum
/// never exceeds [`POINT_CAP`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attributes {
    /// Strength score.
    pub strength: u8,
    /// Dexterity score.
    pub dexterity: u8,
    /// Intelligence score.
    pub intelligence: u8,
}

impl Default for Attributes {
    fn default() -> Self {
        Self {
            strength: 7,
            dexterity: 7,
            intelligence: 6,
        }
    }
}

impl Attributes {
    /// Builds a validated triple.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if a score is below the minimum or
    /// the total exceeds the cap.
    pub fn new(strength: u8, dexterity: u8, intelligence: u8) -> Result<Self, DomainError> {
        let attributes = Self {
            strength,
            dexterity,
            intelligence,
        };
        attributes.validate()?;
        Ok(attributes)
    }

    /// Checks the budget invariant.
    ///
    /// # Errors
    ///
    /// Returns `DomainError::Validation` if a score is below the minimum or
    /// the total exceeds the cap.
    pub fn validate(&self) -> Result<(), DomainError> {
        if [self.strength, self.dexterity, self.intelligence]
            .iter()
            .any(|&score| score < MIN_SCORE)
        {
            return Err(DomainError::Validation(format!(
                "every attribute must be at least {MIN_SCORE}"
            )));
        }
        if self.total() > u16::from(POINT_CAP) {
            return Err(DomainError::Validation(format!(
                "attributes total {} exceeds the budget of {POINT_CAP}",
                self.total()
            )));
        }
        Ok(())
    }

    /// Sum of the three scores.
    #[must_use]
    pub fn total(&self) -> u16 {
        u16::from(self.strength) + u16::from(self.dexterity) + u16::from(self.intelligence)
    }

    /// Returns one score.
    #[must_use]
    pub fn get(&self, attribute: Attribute) -> u8 {
        match attribute {
            Attribute::Strength => self.strength,
            Attribute::Dexterity => self.dexterity,
            Attribute::Intelligence => self.intelligence,
        }
    }

    /// Returns a copy with `attribute` moved towards `requested`, clamped so
    /// the score stays at least [`MIN_SCORE`] and the total stays within
    /// [`POINT_CAP`] with the other two held fixed.
    #[must_use]
    pub fn adjusted(self, attribute: Attribute, requested: u8) -> Self {
        let others = self.total() - u16::from(self.get(attribute));
        let ceiling = u16::from(POINT_CAP).saturating_sub(others);
        // ceiling <= POINT_CAP, so it fits in a u8.
        let ceiling = u8::try_from(ceiling).unwrap_or(POINT_CAP);
        let value = requested.min(ceiling).max(MIN_SCORE);

        let mut next = self;
        match attribute {
            Attribute::Strength => next.strength = value,
            Attribute::Dexterity => next.dexterity = value,
            Attribute::Intelligence => next.intelligence = value,
        }
        next
    }
}
