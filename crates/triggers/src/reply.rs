use rand::{Rng, seq::SliceRandom as _};

/// What a trigger answers with: one fixed text, or one of several variants
/// picked at random on every fire.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reply {
    Single(String),
    Variants(Variants),
}

/// A list of reply texts that is never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Variants(Vec<String>);

impl Variants {
    #[must_use]
    pub fn new(texts: Vec<String>) -> Option<Self> {
        (!texts.is_empty()).then_some(Self(texts))
    }

    #[must_use]
    pub fn as_slice(&self) -> &[String] {
        &self.0
    }
}

impl Reply {
    /// Picks the text to send. `Single` ignores `rng`.
    pub fn pick<R: Rng + ?Sized>(&self, rng: &mut R) -> &str {
        match self {
            Self::Single(text) => text,
            Self::Variants(variants) => variants.0.choose(rng).map_or("", String::as_str),
        }
    }

    #[must_use]
    pub fn texts(&self) -> &[String] {
        match self {
            Self::Single(text) => core::slice::from_ref(text),
            Self::Variants(variants) => variants.as_slice(),
        }
    }
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng as _, rngs::StdRng};

    use super::*;

    #[test]
    fn empty_variants_are_unrepresentable() {
        assert!(Variants::new(Vec::new()).is_none());
        assert!(Variants::new(vec!["a".to_owned()]).is_some());
    }

    #[test]
    fn pick_stays_within_variants() {
        let reply = Reply::Variants(Variants::new(vec!["Hi".to_owned(), "Yo".to_owned()]).unwrap());
        let mut rng = StdRng::seed_from_u64(1);
        let mut seen = std::collections::HashSet::new();
        for _ in 0..64 {
            let text = reply.pick(&mut rng);
            assert!(text == "Hi" || text == "Yo");
            seen.insert(text.to_owned());
        }
        assert_eq!(seen.len(), 2);
    }

    #[test]
    fn single_always_answers_the_same() {
        let reply = Reply::Single("Pong!".to_owned());
        let mut rng = StdRng::seed_from_u64(9);
        assert_eq!(reply.pick(&mut rng), "Pong!");
        assert_eq!(reply.texts(), ["Pong!".to_owned()]);
    }
}
