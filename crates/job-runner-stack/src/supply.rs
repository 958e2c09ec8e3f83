//! Supply-or-synthesize values
//!
//! Identity and image follow the same shape: the caller either hands over a
//! concrete value, or leaves it to be produced from a recipe. Keeping both
//! branches in one enum makes every consumer handle both.

/// A value that is either provided by the caller or synthesized from a recipe
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Supply<T, R> {
    /// Use this value verbatim
    Provided(T),
    /// Produce a value from this recipe
    ToSynthesize(R),
}

impl<T, R> Supply<T, R> {
    /// Build from an optional caller value, falling back to a recipe.
    ///
    /// The recipe closure only runs when `value` is `None`.
    pub fn from_option(value: Option<T>, recipe: impl FnOnce() -> R) -> Self {
        match value {
            Some(v) => Supply::Provided(v),
            None => Supply::ToSynthesize(recipe()),
        }
    }

    pub fn is_provided(&self) -> bool {
        matches!(self, Supply::Provided(_))
    }

    pub fn provided(&self) -> Option<&T> {
        match self {
            Supply::Provided(v) => Some(v),
            Supply::ToSynthesize(_) => None,
        }
    }

    pub fn recipe(&self) -> Option<&R> {
        match self {
            Supply::Provided(_) => None,
            Supply::ToSynthesize(r) => Some(r),
        }
    }

    /// Fallibly transform the provided branch, leaving recipes untouched.
    pub fn try_map_provided<U, E>(
        self,
        f: impl FnOnce(T) -> Result<U, E>,
    ) -> Result<Supply<U, R>, E> {
        match self {
            Supply::Provided(v) => f(v).map(Supply::Provided),
            Supply::ToSynthesize(r) => Ok(Supply::ToSynthesize(r)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn recipe_only_evaluated_when_absent() {
        let mut calls = 0;
        let s: Supply<u32, &str> = Supply::from_option(Some(7), || {
            calls += 1;
            "recipe"
        });
        assert_eq!(s.provided(), Some(&7));
        assert_eq!(calls, 0);

        let s: Supply<u32, &str> = Supply::from_option(None, || "recipe");
        assert_eq!(s.recipe(), Some(&"recipe"));
        assert!(!s.is_provided());
    }

    #[test]
    fn try_map_provided_propagates_errors() {
        let s: Supply<&str, ()> = Supply::Provided("nope");
        let r: Result<Supply<u32, ()>, _> = s.try_map_provided(|v| v.parse::<u32>());
        assert!(r.is_err());

        let s: Supply<&str, ()> = Supply::ToSynthesize(());
        let r: Result<Supply<u32, ()>, std::num::ParseIntError> =
            s.try_map_provided(|v| v.parse::<u32>());
        assert_eq!(r.unwrap(), Supply::ToSynthesize(()));
    }
}
