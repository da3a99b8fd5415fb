//! Offline reply matcher used when no provider answers.
//!
//! Rules are evaluated in a fixed order against the lower-cased, trimmed
//! message and the first match wins, so "hi, why is the sky blue?" gets the
//! greeting. Messages matching nothing get a random encouraging prompt.

use rand::Rng;
use regex::Regex;

use crate::chat::error::ChatResult;

/// Source of uniform random indices, injectable for tests.
pub trait RandomSource: Send + Sync {
    /// Return an index in `0..n`. `n` is always at least 1.
    fn pick(&self, n: usize) -> usize;
}

/// [`RandomSource`] backed by the thread-local RNG.
#[derive(Clone, Copy, Debug, Default)]
pub struct ThreadRngSource;

impl RandomSource for ThreadRngSource {
    fn pick(&self, n: usize) -> usize {
        if n <= 1 {
            return 0;
        }
        rand::thread_rng().gen_range(0..n)
    }
}

/// Category that produced a local reply.
#[derive(Clone, Copy, Debug, Eq, PartialEq, Hash)]
pub enum MatchCategory {
    /// Hello / hi / good morning.
    Greeting,
    /// Mentions the product by name.
    Product,
    /// Games and play.
    Games,
    /// Learning and school.
    Learning,
    /// Space and astronomy.
    Space,
    /// Animals.
    Animals,
    /// "Why ..." questions.
    ScienceWhy,
    /// "How ..." questions.
    ScienceHow,
    /// "What is ..." / "explain ..." questions.
    ScienceGeneric,
    /// Math and numbers.
    Math,
    /// Nothing matched; random encouragement.
    Encouragement,
}

/// Reply chosen by the matcher.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct LocalReply {
    /// Category that matched.
    pub category: MatchCategory,
    /// Reply text.
    pub text: &'static str,
}

const GREETING_REPLY: &str = "Hi there, explorer! 👋 I'm Chizel Buddy. Ask me anything about \
space, animals, numbers or how the world works, and let's discover something new together!";

const PRODUCT_REPLY: &str = "Chizel is a playful learning app for curious kids! 🎨 It mixes games, \
stories and creative challenges so that learning feels like an adventure. What would you like \
to explore first?";

const GAMES_REPLY: &str = "I love games too! 🎮 Chizel has puzzles, quizzes and creative challenges \
that make your brain stronger while you play. Want to try a quick riddle?";

const LEARNING_REPLY: &str = "Learning is a superpower! 📚 Every question you ask makes your brain \
grow. What subject are you curious about today?";

const SPACE_REPLY: &str = "Space is amazing! 🚀 Did you know the Sun is so big that about one \
million Earths could fit inside it? What would you like to know about planets or stars?";

const ANIMALS_REPLY: &str = "Animals are awesome! 🦁 Did you know an octopus has three hearts and \
blue blood? Which animal is your favorite?";

const WHY_REPLY: &str = "What a great \"why\" question! 🤔 Scientists start every discovery \
just like that. What do you think the answer might be? Let's figure it out together!";

const HOW_REPLY: &str = "Ooh, you want to know how it works! 🔍 Let's think about it step by \
step. What is the first thing you think happens?";

const GENERIC_SCIENCE_REPLY: &str = "That's a wonderful thing to wonder about! 🌟 Can you tell \
me what you already know about it? Then we can explore the rest together.";

const MATH_REPLY: &str = "Numbers are like puzzles waiting to be solved! 🔢 Try counting things \
around you, or give me a math question and we'll work it out together.";

const ENCOURAGEMENTS: &[&str] = &[
    "That's so interesting! ✨ Tell me more about what you're thinking.",
    "Great question! 🌈 What made you curious about that?",
    "I love how curious you are! 🧠 Can you tell me a little more?",
    "Wow, you're a real explorer! 🗺️ What would you like to discover next?",
    "Keep those ideas coming! 💡 What else would you like to learn about?",
    "You're thinking like a scientist! 🔬 What do you want to find out?",
];

struct PatternRule {
    pattern: Regex,
    category: MatchCategory,
    reply: &'static str,
}

/// Ordered rule matcher producing canned replies. Never fails.
pub struct LocalMatcher {
    rules: Vec<PatternRule>,
}

impl LocalMatcher {
    /// Compile the rule set.
    ///
    /// # Errors
    /// Returns an error if any regex pattern is invalid.
    pub fn new() -> ChatResult<Self> {
        let table: [(&str, MatchCategory, &'static str); 10] = [
            (
                r"\b(hi|hello|hey|hiya|howdy|greetings|good (morning|afternoon|evening))\b",
                MatchCategory::Greeting,
                GREETING_REPLY,
            ),
            (r"chizel", MatchCategory::Product, PRODUCT_REPLY),
            (
                r"\b(games?|play(ing)?|fun|puzzles?|quiz(zes)?|riddles?)\b",
                MatchCategory::Games,
                GAMES_REPLY,
            ),
            (
                r"\b(learn(ing)?|study(ing)?|school|homework|teach(er)?|lessons?|read(ing)?)\b",
                MatchCategory::Learning,
                LEARNING_REPLY,
            ),
            (
                r"\b(space|planets?|stars?|moon|sun|rockets?|astronauts?|galaxy|universe|mars)\b",
                MatchCategory::Space,
                SPACE_REPLY,
            ),
            (
                r"\b(animals?|dogs?|cats?|lions?|tigers?|elephants?|dinosaurs?|birds?|fish|pets?)\b",
                MatchCategory::Animals,
                ANIMALS_REPLY,
            ),
            (r"\bwhy\b", MatchCategory::ScienceWhy, WHY_REPLY),
            (r"\bhow\b", MatchCategory::ScienceHow, HOW_REPLY),
            (
                r"\b(what is|what are|what's|explain|science|experiments?)\b",
                MatchCategory::ScienceGeneric,
                GENERIC_SCIENCE_REPLY,
            ),
            (
                r"\b(math|maths|numbers?|count(ing)?|add|plus|minus|subtract|multiply|times|divide)\b|\d+\s*[-+*/x]\s*\d+",
                MatchCategory::Math,
                MATH_REPLY,
            ),
        ];

        let rules = table
            .into_iter()
            .map(|(pattern, category, reply)| {
                Ok(PatternRule {
                    pattern: Regex::new(pattern)?,
                    category,
                    reply,
                })
            })
            .collect::<ChatResult<Vec<_>>>()?;

        Ok(Self { rules })
    }

    /// Pick a reply for `message`.
    #[must_use]
    pub fn reply(&self, message: &str, random: &dyn RandomSource) -> LocalReply {
        let normalized = message.trim().to_lowercase();

        if let Some(rule) = self.rules.iter().find(|r| r.pattern.is_match(&normalized)) {
            return LocalReply {
                category: rule.category,
                text: rule.reply,
            };
        }

        let index = random.pick(ENCOURAGEMENTS.len()).min(ENCOURAGEMENTS.len() - 1);
        LocalReply {
            category: MatchCategory::Encouragement,
            text: ENCOURAGEMENTS[index],
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::chat::testing::FixedRandom;

    fn matcher() -> LocalMatcher {
        LocalMatcher::new().expect("rules compile")
    }

    fn category(message: &str) -> MatchCategory {
        matcher().reply(message, &FixedRandom(0)).category
    }

    #[test]
    fn test_hello_is_always_greeting() {
        let m = matcher();
        for _ in 0..50 {
            let reply = m.reply("hello", &ThreadRngSource);
            assert_eq!(reply.category, MatchCategory::Greeting);
            assert_eq!(reply.text, GREETING_REPLY);
        }
    }

    #[test]
    fn test_greeting_wins_over_question() {
        assert_eq!(category("hi, why is the sky blue?"), MatchCategory::Greeting);
    }

    #[test]
    fn test_product_mention() {
        let reply = matcher().reply("Tell me about Chizel", &FixedRandom(0));
        assert_eq!(reply.category, MatchCategory::Product);
        assert!(reply.text.contains("Chizel is a playful learning app"));
    }

    #[test]
    fn test_categories_in_order() {
        let cases = [
            ("Good morning!", MatchCategory::Greeting),
            ("can we play a game", MatchCategory::Games),
            ("I have homework", MatchCategory::Learning),
            ("tell me about planets", MatchCategory::Space),
            ("I like dinosaurs", MatchCategory::Animals),
            ("why is grass green", MatchCategory::ScienceWhy),
            ("how do magnets work", MatchCategory::ScienceHow),
            ("what is electricity", MatchCategory::ScienceGeneric),
            ("explain rainbows", MatchCategory::ScienceGeneric),
            ("what's 2 + 2", MatchCategory::ScienceGeneric),
            ("2 + 2", MatchCategory::Math),
            ("I love numbers", MatchCategory::Math),
        ];
        for (message, expected) in cases {
            assert_eq!(category(message), expected, "{message}");
        }
    }

    #[test]
    fn test_earlier_category_wins() {
        // Space before animals, why before how.
        assert_eq!(category("do cats go to space"), MatchCategory::Space);
        assert_eq!(category("why and how"), MatchCategory::ScienceWhy);
        assert_eq!(category("play with the moon"), MatchCategory::Games);
    }

    #[test]
    fn test_word_boundaries() {
        // "this" contains "hi", "shower" contains "how".
        assert_eq!(category("this shower"), MatchCategory::Encouragement);
    }

    #[test]
    fn test_unmatched_uses_injected_random() {
        let m = matcher();
        for (i, expected) in ENCOURAGEMENTS.iter().enumerate() {
            let reply = m.reply("blorp", &FixedRandom(i));
            assert_eq!(reply.category, MatchCategory::Encouragement);
            assert_eq!(reply.text, *expected);
        }
        assert!(ENCOURAGEMENTS.len() >= 5);
    }

    #[test]
    fn test_out_of_range_random_is_clamped() {
        struct Wild;
        impl RandomSource for Wild {
            fn pick(&self, _n: usize) -> usize {
                usize::MAX
            }
        }
        let reply = matcher().reply("blorp", &Wild);
        assert_eq!(Some(&reply.text), ENCOURAGEMENTS.last());
    }

    #[test]
    fn test_thread_rng_stays_in_range() {
        for n in 1..20 {
            assert!(ThreadRngSource.pick(n) < n);
        }
    }

    #[test]
    fn test_input_is_normalized() {
        assert_eq!(category("   HELLO   "), MatchCategory::Greeting);
        assert_eq!(category("CHIZEL?"), MatchCategory::Product);
    }
}
