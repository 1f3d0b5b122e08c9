//! Canned reply texts.

use rand::seq::SliceRandom;
use wbbot_core::domain::entry::EntryKind;

use crate::client::THUMBS_UP;

pub const USAGE: &str = "*Usage*:
    `wb [command] [text...]`
where commands include:
*Registration Command*
    `register`, `r` - Registers the standup with the given standup ID
*Create Commands*
    `faces`, `f` - Creates a new faces entry with the given name
    `helps`, `h` - Creates a new helps entry with the given title
    `interestings`, `i` - Creates a new interestings entry with the given title
    `events`, `e` - Creates a new events entry with the given title
*Update Commands*
    `name`, `n` - Updates the name of the current faces entry
    `title`, `t` - Updates the title of the current entry
    `body`, `b` - Updates the body of the current entry
    `date`, `d` - Updates the date of the current entry (YYYY-MM-DD)
*Present Command*
    `present [n]`, `p [n]` - Shows the standup, optionally only entries up to n days ahead
*Help*
    `?` - Shows this message

Example:
    `wb r 1`
    `wb f Andrew Leung`
    `wb d 2015-01-02`";

pub const MISSING_TITLE: &str =
    "Hey, next time add a title along with your entry!\nLike this: `wb i My title`\nNeed help? Try `wb ?`";

pub const EMPTY_TITLE: &str = "Oi! The title/name can't be empty!";

pub const NOT_REGISTERED: &str =
    "You haven't registered your standup yet. `wb r <id>` first!";

pub const MISSING_ENTRY: &str =
    "Hey, you forgot to start new entry. Start with one of `wb [faces|interestings|helps|events] [title]` first!";

pub const INVALID_DATE: &str = "Date not set, use YYYY-MM-DD as date format\n";

pub const NOTHING_TO_PRESENT: &str =
    "Hey, there's no entries in today's standup yet, why not add some?";

const INSULTS: &[&str] = &[
    "Nice try, buddy.",
    "Did you even read `wb ?`",
    "Computer says no.",
    "Not today.",
    "Have you tried turning it off and on again?",
    "You had one job.",
];

pub fn random_insult() -> &'static str {
    INSULTS.choose(&mut rand::thread_rng()).copied().unwrap_or("Nope.")
}

pub fn face_has_no_body() -> String {
    format!("Face does not have a body! {}", random_insult())
}

pub fn standup_not_found(standup_id: &str) -> String {
    format!("Standup not found: `{standup_id}`. Check the standup ID and try `wb r <id>` again.")
}

pub fn standup_registered(title: &str) -> String {
    format!("Standup {title} has been registered! You can now start creating Whiteboard entries!")
}

pub fn registration_not_saved(title: &str) -> String {
    format!("Found standup {title} but could not save the registration. Please try again.")
}

pub fn default_echo(username: &str, remainder: &str) -> String {
    format!("{username} no you {remainder}")
}

/// Status line placed above an entry after the backend accepted it.
pub fn created_status(kind: EntryKind) -> String {
    format!(
        "{THUMBS_UP}_Now go update the details. Need help?_ `wb ?`\n\n{} created\n",
        kind.label().to_uppercase()
    )
}

pub fn updated_status(kind: EntryKind) -> String {
    format!("{THUMBS_UP}{} updated\n", kind.label().to_uppercase())
}
