//! System prompt construction.

use super::character::{Attributes, Character};

/// The scripted player turn that asks both narrators for the opening scene.
/// It is sent but never stored.
pub const OPENING_TURN: &str =
    "Begin the adventure by narrating the opening scene and ask the player what they want to do.";

/// Builds the system prompt both narrators share for a session.
#[must_use]
pub fn system_prompt(character: &Character, attributes: &Attributes, prologue: &str) -> String {
    format!(
        "You are a Dungeons & Dragons Dungeon Master. The player controls {name}, {article} {race} {class}.\n\
         Their attributes are: Strength {strength}, Dexterity {dexterity}, Intelligence {intelligence}.\n\
         Adventure context: {prologue}\n\
         Instructions: narrate a vivid, action-packed dark fantasy story. Be descriptive but keep the pace. \
         Stay consistent with everything narrated so far.",
        name = character.name.trim(),
        article = character.race.article(),
        race = character.race,
        class = character.class,
        strength = attributes.strength,
        dexterity = attributes.dexterity,
        intelligence = attributes.intelligence,
        prologue = prologue.trim(),
    )
}
