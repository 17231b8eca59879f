//! Static greeting table: the terminal tier of message resolution.
//!
//! When generation fails (timeout, quota, malformed response) the resolver
//! still has to produce usable text, so these are plain strings keyed by
//! occasion and tone. Unknown tones get the warm variant.

use wishline_core::types::Occasion;

/// Built-in greeting for an occasion and tone. Never empty.
pub fn fallback_greeting(name: &str, occasion: Occasion, tone: &str) -> String {
    match (occasion, tone) {
        (Occasion::Birthday, "professional") => format!(
            "Happy Birthday, {name}. Wishing you a successful year ahead filled with \
             growth and achievement. Enjoy your special day."
        ),
        (Occasion::Birthday, "casual") => format!(
            "Happy birthday, {name}! Hope your day is awesome. Enjoy every minute of it!"
        ),
        (Occasion::Birthday, "funny") => format!(
            "Happy Birthday, {name}! You're not getting older, you're just leveling up. \
             Go celebrate!"
        ),
        (Occasion::Birthday, _) => format!(
            "Happy Birthday, {name}! Wishing you a wonderful day filled with joy, laughter, \
             and all your favorite things. May this new year of your life bring you \
             happiness, success, and beautiful memories!"
        ),
        (Occasion::Anniversary, "professional") => format!(
            "Happy Anniversary, {name}. Wishing you both continued happiness and many \
             more years together."
        ),
        (Occasion::Anniversary, "casual") => format!(
            "Happy anniversary, {name}! Here's to you two. Have a great one!"
        ),
        (Occasion::Anniversary, "funny") => format!(
            "Happy Anniversary, {name}! Another year of putting up with each other. \
             That definitely deserves cake!"
        ),
        (Occasion::Anniversary, _) => format!(
            "Happy Anniversary, {name}! Celebrating another year of love, laughter, and \
             beautiful memories together. Wishing you both continued happiness and many \
             more wonderful years ahead!"
        ),
    }
}
